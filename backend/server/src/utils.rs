use mongodb::bson::oid::ObjectId;

use crate::error::AppError;

/// Rejects anything that is not a 24 character hex object id instead of
/// letting the query silently match nothing.
pub fn parse_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::MalformedId(id.to_string()))
}
