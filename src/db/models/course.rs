//! Course catalog models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub is_free: bool,
    pub thumbnail_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Catalog row: a course joined with its lesson count.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub is_free: bool,
    pub thumbnail_url: Option<String>,
    pub created_at: String,
    pub lesson_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Initial lessons, created with the course in submission order.
    #[serde(default)]
    pub lessons: Vec<NewLessonInput>,
}

#[derive(Debug, Deserialize)]
pub struct NewLessonInput {
    pub title: String,
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_free: Option<bool>,
    /// Empty string clears the thumbnail.
    pub thumbnail_url: Option<String>,
}
