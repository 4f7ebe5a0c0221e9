use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // argon2 hash, not exposed in JSON
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}
