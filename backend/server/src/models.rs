//! # Documents
//!
//! JSON shapes exchanged with the frontend. Foods and purchases are schema-free,
//! they are stored exactly as posted and handed back as stored, with the store
//! assigned identifier under `_id` as a 24 character hex string.
//!
//! ## Collections
//! - `foods`: one menu entry per document, owned by the user in `email`
//! - `purchases`: one buy per document, `foodId` is a loose reference into `foods`
//!
//! Only the fields a route actually reads are typed: the owner `email`, the
//! full-record field list of [`FoodDetails`], and the aggregation outputs.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A stored food or purchase document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

pub type Food = Record;
pub type Purchase = Record;

impl Record {
    /// Drops any client supplied `_id` so the store assigns one.
    pub fn new_document(mut fields: Map<String, Value>) -> Self {
        fields.remove("_id");

        Self(fields)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("_id")
    }

    /// Owner of a food, buyer of a purchase.
    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Field list written by a full food update. Anything else on the stored
/// document is left alone, missing fields are written as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodDetails {
    #[serde(default)]
    pub food_name: Value,
    #[serde(default)]
    pub image: Value,
    #[serde(default)]
    pub category: Value,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub food_origin: Value,
    #[serde(default)]
    pub description: Value,
    /// Owner's email.
    pub email: String,
    /// Owner's display name.
    #[serde(default)]
    pub name: Value,
}

impl FoodDetails {
    pub fn into_fields(self) -> Map<String, Value> {
        let fields = [
            ("foodName", self.food_name),
            ("image", self.image),
            ("category", self.category),
            ("quantity", self.quantity),
            ("price", self.price),
            ("foodOrigin", self.food_origin),
            ("description", self.description),
            ("email", Value::String(self.email)),
            ("name", self.name),
        ];

        fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

/// Summed purchase quantity for one food.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseTotal {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub food_id: Option<Value>,
    pub total_quantity: Number,
}

impl Default for PurchaseTotal {
    fn default() -> Self {
        Self {
            food_id: None,
            total_quantity: Number::from(0),
        }
    }
}

/// One group of purchases sharing a `foodId`, display fields taken from the
/// first purchase of the group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSeller {
    #[serde(rename = "_id")]
    pub food_id: Value,
    pub food_name: Value,
    pub price: Value,
    pub total_quantity: Number,
    pub image: Value,
    pub food_origin: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Body of `POST /jwt`. Every field besides `email` is carried into the token.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub success: bool,
}

/// Running `$sum`: stays an integer until a float shows up, skips non-numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuantitySum {
    integer: i64,
    float: Option<f64>,
}

impl QuantitySum {
    pub fn add(&mut self, value: Option<&Value>) {
        let Some(Value::Number(number)) = value else {
            return;
        };

        match (number.as_i64(), self.float) {
            (Some(integer), None) => self.integer += integer,
            (Some(integer), Some(float)) => self.float = Some(float + integer as f64),
            (None, _) => self.float = Some(self.as_f64() + number.as_f64().unwrap_or(0.0)),
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.float.unwrap_or(self.integer as f64)
    }

    pub fn into_number(self) -> Number {
        match self.float {
            Some(float) => Number::from_f64(float).unwrap_or_else(|| Number::from(0)),
            None => Number::from(self.integer),
        }
    }
}
