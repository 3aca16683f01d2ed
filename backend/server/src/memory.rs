//! In-process [`Store`] with the same observable behavior as MongoDB.
//!
//! Used for local development (`STORE_BACKEND=memory`) and the test suite.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use mongodb::bson::oid::ObjectId;
use serde_json::{Map, Value};

use crate::{
    database::Store,
    error::AppError,
    models::{
        DeleteResult, Food, FoodDetails, InsertResult, Purchase, PurchaseTotal, QuantitySum,
        Record, TopSeller, UpdateResult,
    },
};

type Fields = Map<String, Value>;

#[derive(Default)]
struct Collections {
    foods: BTreeMap<ObjectId, Fields>,
    // purchases keep insertion order for the `$first` semantics of top sellers
    purchases: Vec<(ObjectId, Fields)>,
}

/// Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, AppError> {
        self.collections
            .read()
            .map_err(|_| AppError::internal("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, AppError> {
        self.collections
            .write()
            .map_err(|_| AppError::internal("lock poisoned"))
    }
}

fn stored(id: &ObjectId, fields: &Fields) -> Record {
    let mut fields = fields.clone();
    fields.insert("_id".to_string(), Value::String(id.to_hex()));

    Record(fields)
}

fn without_id(record: Record) -> Fields {
    let mut fields = record.0;
    fields.remove("_id");

    fields
}

fn str_eq(fields: &Fields, key: &str, expected: &str) -> bool {
    fields.get(key).and_then(Value::as_str) == Some(expected)
}

fn field(fields: &Fields, key: &str) -> Value {
    fields.get(key).cloned().unwrap_or(Value::Null)
}

fn unmatched() -> UpdateResult {
    UpdateResult {
        acknowledged: true,
        matched_count: 0,
        modified_count: 0,
        upserted_count: 0,
        upserted_id: None,
    }
}

/// Applies `$set` semantics, reporting whether anything changed.
fn set_fields(target: &mut Fields, updates: Fields) -> bool {
    let mut modified = false;

    for (key, value) in updates {
        if target.get(&key) != Some(&value) {
            target.insert(key, value);
            modified = true;
        }
    }

    modified
}

struct Group {
    food_id: Value,
    first: Fields,
    total: QuantitySum,
}

impl Store for MemoryStore {
    async fn insert_food(&self, food: Food) -> Result<InsertResult, AppError> {
        let id = ObjectId::new();
        self.write()?.foods.insert(id, without_id(food));

        Ok(InsertResult {
            acknowledged: true,
            inserted_id: id.to_hex(),
        })
    }

    async fn find_foods(&self, owner: Option<&str>) -> Result<Vec<Food>, AppError> {
        let collections = self.read()?;

        Ok(collections
            .foods
            .iter()
            .filter(|(_, food)| owner.is_none_or(|email| str_eq(food, "email", email)))
            .map(|(id, food)| stored(id, food))
            .collect())
    }

    async fn find_food(&self, id: ObjectId) -> Result<Option<Food>, AppError> {
        Ok(self.read()?.foods.get(&id).map(|food| stored(&id, food)))
    }

    async fn set_food_quantity(&self, id: ObjectId, quantity: u32) -> Result<UpdateResult, AppError> {
        let mut collections = self.write()?;

        let Some(food) = collections.foods.get_mut(&id) else {
            return Ok(unmatched());
        };

        let update = Fields::from_iter([("quantity".to_string(), Value::from(quantity))]);
        let modified = set_fields(food, update);

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: u64::from(modified),
            ..unmatched()
        })
    }

    async fn upsert_food(&self, id: ObjectId, food: FoodDetails) -> Result<UpdateResult, AppError> {
        let mut collections = self.write()?;

        if let Some(existing) = collections.foods.get_mut(&id) {
            let modified = set_fields(existing, food.into_fields());

            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: u64::from(modified),
                ..unmatched()
            });
        }

        collections.foods.insert(id, food.into_fields());

        Ok(UpdateResult {
            upserted_count: 1,
            upserted_id: Some(id.to_hex()),
            ..unmatched()
        })
    }

    async fn insert_purchase(&self, purchase: Purchase) -> Result<InsertResult, AppError> {
        let id = ObjectId::new();
        self.write()?.purchases.push((id, without_id(purchase)));

        Ok(InsertResult {
            acknowledged: true,
            inserted_id: id.to_hex(),
        })
    }

    async fn find_purchases(&self, email: &str) -> Result<Vec<Purchase>, AppError> {
        Ok(self
            .read()?
            .purchases
            .iter()
            .filter(|(_, purchase)| str_eq(purchase, "email", email))
            .map(|(id, purchase)| stored(id, purchase))
            .collect())
    }

    async fn find_purchase(&self, id: ObjectId) -> Result<Option<Purchase>, AppError> {
        Ok(self
            .read()?
            .purchases
            .iter()
            .find(|(purchase_id, _)| *purchase_id == id)
            .map(|(id, purchase)| stored(id, purchase)))
    }

    async fn delete_purchase(&self, id: ObjectId) -> Result<DeleteResult, AppError> {
        let mut collections = self.write()?;
        let before = collections.purchases.len();

        if let Some(index) = collections
            .purchases
            .iter()
            .position(|(purchase_id, _)| *purchase_id == id)
        {
            collections.purchases.remove(index);
        }

        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: (before - collections.purchases.len()) as u64,
        })
    }

    async fn total_purchased(&self, food_id: &str) -> Result<PurchaseTotal, AppError> {
        let collections = self.read()?;

        let mut matches = collections
            .purchases
            .iter()
            .filter(|(_, purchase)| str_eq(purchase, "foodId", food_id))
            .peekable();

        if matches.peek().is_none() {
            return Ok(PurchaseTotal::default());
        }

        let mut total = QuantitySum::default();
        for (_, purchase) in matches {
            total.add(purchase.get("quantity"));
        }

        Ok(PurchaseTotal {
            food_id: Some(Value::String(food_id.to_string())),
            total_quantity: total.into_number(),
        })
    }

    async fn top_sellers(&self, limit: i64) -> Result<Vec<TopSeller>, AppError> {
        let collections = self.read()?;
        let mut groups: Vec<Group> = Vec::new();

        for (_, purchase) in &collections.purchases {
            let food_id = field(purchase, "foodId");

            let index = match groups.iter().position(|group| group.food_id == food_id) {
                Some(index) => index,
                None => {
                    groups.push(Group {
                        food_id,
                        first: purchase.clone(),
                        total: QuantitySum::default(),
                    });

                    groups.len() - 1
                }
            };

            groups[index].total.add(purchase.get("quantity"));
        }

        // stable, ties stay in first-purchase order
        groups.sort_by(|a, b| b.total.as_f64().total_cmp(&a.total.as_f64()));
        groups.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(groups
            .into_iter()
            .map(|group| TopSeller {
                food_name: field(&group.first, "foodName"),
                price: field(&group.first, "price"),
                image: field(&group.first, "image"),
                food_origin: field(&group.first, "foodOrigin"),
                total_quantity: group.total.into_number(),
                food_id: group.food_id,
            })
            .collect())
    }
}
