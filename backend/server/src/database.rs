//! # MongoDB
//!
//! Document store holding every persisted record.
//!
//! Two collections live in one database, `foods` and `purchases`. Handlers
//! never touch the driver directly, they go through [`Store`] so the same
//! routes can run against [`crate::memory::MemoryStore`].
//!
//! ## Requirements
//!
//! - One long-lived client shared by every request
//! - Each handler performs at most one store operation
//! - No transactions, per-document atomicity only
//!
//! ## Implementation
//!
//! - Collections are untyped (`Document`), records cross to JSON as relaxed extended JSON
//! - `_id` leaves the store as a hex string and is never written from a payload
//! - Purchase totals and top sellers are server-side aggregation pipelines
//! - Full food updates are `$set` upserts, fields outside [`FoodDetails`] are left alone
use std::{future::Future, time::Duration};

use mongodb::{
    Client, Collection, Cursor,
    bson::{Bson, Document, doc, oid::ObjectId, to_document},
    options::ClientOptions,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    error::AppError,
    models::{
        DeleteResult, Food, FoodDetails, InsertResult, Purchase, PurchaseTotal, Record, TopSeller,
        UpdateResult,
    },
};

pub const FOODS: &str = "foods";
pub const PURCHASES: &str = "purchases";

pub const TOP_SELLER_LIMIT: i64 = 6;

/// Operations the route handlers need from a document store.
pub trait Store: Send + Sync + 'static {
    fn insert_food(&self, food: Food)
    -> impl Future<Output = Result<InsertResult, AppError>> + Send;

    /// All foods, or only those whose owner email equals `owner`.
    fn find_foods(
        &self,
        owner: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Food>, AppError>> + Send;

    fn find_food(&self, id: ObjectId)
    -> impl Future<Output = Result<Option<Food>, AppError>> + Send;

    fn set_food_quantity(
        &self,
        id: ObjectId,
        quantity: u32,
    ) -> impl Future<Output = Result<UpdateResult, AppError>> + Send;

    /// Sets every [`FoodDetails`] field of `id`, creating the document when absent.
    fn upsert_food(
        &self,
        id: ObjectId,
        food: FoodDetails,
    ) -> impl Future<Output = Result<UpdateResult, AppError>> + Send;

    fn insert_purchase(
        &self,
        purchase: Purchase,
    ) -> impl Future<Output = Result<InsertResult, AppError>> + Send;

    fn find_purchases(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Vec<Purchase>, AppError>> + Send;

    fn find_purchase(
        &self,
        id: ObjectId,
    ) -> impl Future<Output = Result<Option<Purchase>, AppError>> + Send;

    fn delete_purchase(
        &self,
        id: ObjectId,
    ) -> impl Future<Output = Result<DeleteResult, AppError>> + Send;

    /// Sum of purchased quantity for `food_id`, zero when nothing matches.
    fn total_purchased(
        &self,
        food_id: &str,
    ) -> impl Future<Output = Result<PurchaseTotal, AppError>> + Send;

    /// Foods grouped by purchase, highest total quantity first.
    fn top_sellers(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<TopSeller>, AppError>> + Send;
}

#[derive(Clone)]
pub struct MongoStore {
    foods: Collection<Document>,
    purchases: Collection<Document>,
}

pub async fn init_mongo(uri: &str, database: &str) -> Result<MongoStore, AppError> {
    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    options.connect_timeout = Some(Duration::from_secs(5));

    let client = Client::with_options(options)?;
    let database = client.database(database);

    info!("Using database {}", database.name());

    Ok(MongoStore {
        foods: database.collection(FOODS),
        purchases: database.collection(PURCHASES),
    })
}

impl Store for MongoStore {
    async fn insert_food(&self, food: Food) -> Result<InsertResult, AppError> {
        let result = self.foods.insert_one(record_to_document(&food)?).await?;

        Ok(insert_result(result.inserted_id))
    }

    async fn find_foods(&self, owner: Option<&str>) -> Result<Vec<Food>, AppError> {
        let filter = match owner {
            Some(email) => doc! { "email": email },
            None => doc! {},
        };

        let cursor = self.foods.find(filter).await?;

        collect(cursor, record_from_document).await
    }

    async fn find_food(&self, id: ObjectId) -> Result<Option<Food>, AppError> {
        self.foods
            .find_one(doc! { "_id": id })
            .await?
            .map(record_from_document)
            .transpose()
    }

    async fn set_food_quantity(&self, id: ObjectId, quantity: u32) -> Result<UpdateResult, AppError> {
        let result = self
            .foods
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "quantity": i64::from(quantity) } },
            )
            .await?;

        Ok(update_result(result))
    }

    async fn upsert_food(&self, id: ObjectId, food: FoodDetails) -> Result<UpdateResult, AppError> {
        let result = self
            .foods
            .update_one(
                doc! { "_id": id },
                doc! { "$set": to_document(&food.into_fields())? },
            )
            .upsert(true)
            .await?;

        Ok(update_result(result))
    }

    async fn insert_purchase(&self, purchase: Purchase) -> Result<InsertResult, AppError> {
        let result = self
            .purchases
            .insert_one(record_to_document(&purchase)?)
            .await?;

        Ok(insert_result(result.inserted_id))
    }

    async fn find_purchases(&self, email: &str) -> Result<Vec<Purchase>, AppError> {
        let cursor = self.purchases.find(doc! { "email": email }).await?;

        collect(cursor, record_from_document).await
    }

    async fn find_purchase(&self, id: ObjectId) -> Result<Option<Purchase>, AppError> {
        self.purchases
            .find_one(doc! { "_id": id })
            .await?
            .map(record_from_document)
            .transpose()
    }

    async fn delete_purchase(&self, id: ObjectId) -> Result<DeleteResult, AppError> {
        let result = self.purchases.delete_one(doc! { "_id": id }).await?;

        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn total_purchased(&self, food_id: &str) -> Result<PurchaseTotal, AppError> {
        let mut cursor = self.purchases.aggregate(total_pipeline(food_id)).await?;

        if cursor.advance().await? {
            return from_extjson(cursor.deserialize_current()?);
        }

        Ok(PurchaseTotal::default())
    }

    async fn top_sellers(&self, limit: i64) -> Result<Vec<TopSeller>, AppError> {
        let cursor = self.purchases.aggregate(top_sellers_pipeline(limit)).await?;

        collect(cursor, from_extjson).await
    }
}

/// `{ _id: foodId, totalQuantity }` for the purchases of one food.
pub fn total_pipeline(food_id: &str) -> Vec<Document> {
    vec![
        doc! { "$match": { "foodId": food_id } },
        doc! {
            "$group": {
                "_id": "$foodId",
                "totalQuantity": { "$sum": "$quantity" },
            }
        },
    ]
}

/// Purchases grouped by `foodId`, display fields from the first purchase,
/// highest total first.
pub fn top_sellers_pipeline(limit: i64) -> Vec<Document> {
    vec![
        doc! {
            "$group": {
                "_id": "$foodId",
                "foodName": { "$first": "$foodName" },
                "price": { "$first": "$price" },
                "totalQuantity": { "$sum": "$quantity" },
                "image": { "$first": "$image" },
                "foodOrigin": { "$first": "$foodOrigin" },
            }
        },
        doc! { "$sort": { "totalQuantity": -1 } },
        doc! { "$limit": limit },
    ]
}

async fn collect<T, F>(mut cursor: Cursor<Document>, convert: F) -> Result<Vec<T>, AppError>
where
    F: Fn(Document) -> Result<T, AppError>,
{
    let mut items = Vec::new();

    while cursor.advance().await? {
        items.push(convert(cursor.deserialize_current()?)?);
    }

    Ok(items)
}

fn record_to_document(record: &Record) -> Result<Document, AppError> {
    let mut fields = record.0.clone();
    fields.remove("_id");

    Ok(to_document(&fields)?)
}

fn record_from_document(mut document: Document) -> Result<Record, AppError> {
    let id = document
        .remove("_id")
        .ok_or_else(|| AppError::internal("Document without _id"))?;

    let mut fields: Map<String, Value> = document
        .into_iter()
        .map(|(key, value)| (key, value.into_relaxed_extjson()))
        .collect();
    fields.insert("_id".to_string(), Value::String(bson_to_hex(id)));

    Ok(Record(fields))
}

fn from_extjson<T: DeserializeOwned>(document: Document) -> Result<T, AppError> {
    Ok(serde_json::from_value(
        Bson::Document(document).into_relaxed_extjson(),
    )?)
}

fn bson_to_hex(id: Bson) -> String {
    match id {
        Bson::ObjectId(id) => id.to_hex(),
        Bson::String(id) => id,
        other => other.to_string(),
    }
}

fn insert_result(inserted_id: Bson) -> InsertResult {
    InsertResult {
        acknowledged: true,
        inserted_id: bson_to_hex(inserted_id),
    }
}

fn update_result(result: mongodb::results::UpdateResult) -> UpdateResult {
    UpdateResult {
        acknowledged: true,
        matched_count: result.matched_count,
        modified_count: result.modified_count,
        upserted_count: u64::from(result.upserted_id.is_some()),
        upserted_id: result.upserted_id.map(bson_to_hex),
    }
}
