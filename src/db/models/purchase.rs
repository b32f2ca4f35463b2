//! Enrollment records.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row per (user, course) pair; existence grants lesson access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub created_at: String,
}
