//! Lesson models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub video_url: String,
    pub order_index: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Lesson as shown to viewers without access: no video URL.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LessonOutline {
    pub id: String,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub video_url: Option<String>,
}

/// Player payload: the lesson plus its neighbours in course order.
#[derive(Debug, Serialize)]
pub struct LessonPlayerResponse {
    pub lesson: Lesson,
    pub course_title: String,
    pub previous_lesson_id: Option<String>,
    pub next_lesson_id: Option<String>,
}
