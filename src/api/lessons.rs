//! Lesson listing, the player payload and admin lesson CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::access;
use crate::db::{
    AuthUser, CreateLessonRequest, DbPool, Lesson, LessonPlayerResponse, UpdateLessonRequest,
};
use crate::AppState;

use super::auth::AdminUser;
use super::courses::fetch_course;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_media_url, validate_title, validate_uuid};

async fn require_access(
    state: &AppState,
    user: &AuthUser,
    course_id: &str,
) -> Result<(), ApiError> {
    let course = fetch_course(&state.db, course_id).await?;
    if access::course_access(&state.db, &user.id, &course).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You need to purchase this course to access the lessons",
        ))
    }
}

async fn ordered_lessons(db: &DbPool, course_id: &str) -> Result<Vec<Lesson>, ApiError> {
    let lessons = sqlx::query_as::<_, Lesson>(
        "SELECT * FROM lessons WHERE course_id = ? ORDER BY order_index ASC",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;
    Ok(lessons)
}

/// GET /api/courses/:id/lessons
pub async fn list_lessons(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
    user: AuthUser,
) -> Result<Json<Vec<Lesson>>, ApiError> {
    require_access(&state, &user, &course_id).await?;
    Ok(Json(ordered_lessons(&state.db, &course_id).await?))
}

/// GET /api/courses/:course_id/lessons/:lesson_id
///
/// Previous/next are positions in the ordered lesson list, not arithmetic on
/// order_index, so gaps and duplicates in the index still navigate sanely.
pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Path((course_id, lesson_id)): Path<(String, String)>,
    user: AuthUser,
) -> Result<Json<LessonPlayerResponse>, ApiError> {
    if let Err(e) = validate_uuid(&lesson_id, "lesson_id") {
        return Err(ApiError::validation_field("lesson_id", e));
    }

    let course = fetch_course(&state.db, &course_id).await?;
    if !access::course_access(&state.db, &user.id, &course).await? {
        return Err(ApiError::forbidden(
            "You need to purchase this course to access the lessons",
        ));
    }

    let mut lessons = ordered_lessons(&state.db, &course_id).await?;
    let position = lessons
        .iter()
        .position(|l| l.id == lesson_id)
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;

    let previous_lesson_id = position
        .checked_sub(1)
        .and_then(|i| lessons.get(i))
        .map(|l| l.id.clone());
    let next_lesson_id = lessons.get(position + 1).map(|l| l.id.clone());
    let lesson = lessons.swap_remove(position);

    Ok(Json(LessonPlayerResponse {
        lesson,
        course_title: course.title,
        previous_lesson_id,
        next_lesson_id,
    }))
}

fn validate_lesson_fields(title: &str, video_url: &str) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_title(title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_media_url(video_url) {
        errors.add("video_url", e);
    }
    errors.finish()
}

/// Append a lesson to a course. The next order_index is read inside the
/// insert transaction, so concurrent appends cannot pick the same index.
pub(crate) async fn insert_lesson(
    db: &DbPool,
    course_id: &str,
    title: &str,
    video_url: &str,
) -> Result<Lesson, ApiError> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let mut tx = db.begin().await?;

    let (next_index,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(MAX(order_index) + 1, 0) FROM lessons WHERE course_id = ?",
    )
    .bind(course_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO lessons (id, course_id, title, video_url, order_index, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(course_id)
    .bind(title.trim())
    .bind(video_url.trim())
    .bind(next_index)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let lesson = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = ?")
        .bind(&id)
        .fetch_one(db)
        .await?;
    Ok(lesson)
}

/// POST /api/admin/courses/:id/lessons
pub async fn create_lesson(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(course_id): Path<String>,
    Json(req): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<Lesson>), ApiError> {
    let course = fetch_course(&state.db, &course_id).await?;
    validate_lesson_fields(&req.title, &req.video_url)?;

    let lesson = insert_lesson(&state.db, &course.id, &req.title, &req.video_url).await?;
    tracing::info!(course = %course.id, lesson = %lesson.id, admin = %admin.id, "Lesson added");

    Ok((StatusCode::CREATED, Json(lesson)))
}

/// PUT /api/admin/lessons/:id
pub async fn update_lesson(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateLessonRequest>,
) -> Result<Json<Lesson>, ApiError> {
    if let Err(e) = validate_uuid(&id, "lesson_id") {
        return Err(ApiError::validation_field("lesson_id", e));
    }

    let existing = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;

    let title = req.title.clone().unwrap_or(existing.title.clone());
    let video_url = req.video_url.clone().unwrap_or(existing.video_url.clone());
    validate_lesson_fields(&title, &video_url)?;

    sqlx::query("UPDATE lessons SET title = ?, video_url = ?, updated_at = ? WHERE id = ?")
        .bind(title.trim())
        .bind(video_url.trim())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&state.db)
        .await?;

    let lesson = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(lesson))
}

/// DELETE /api/admin/lessons/:id
pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "lesson_id") {
        return Err(ApiError::validation_field("lesson_id", e));
    }

    let result = sqlx::query("DELETE FROM lessons WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Lesson not found"));
    }

    tracing::info!(lesson = %id, admin = %admin.id, "Lesson deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{memory_pool, seed_course, seed_lesson};

    #[tokio::test]
    async fn first_lesson_gets_index_zero() {
        let db = memory_pool().await;
        let course_id = seed_course(&db, "C", 10.0, false).await;

        let lesson = insert_lesson(&db, &course_id, "Intro", "https://cdn.test/0.mp4")
            .await
            .unwrap();
        assert_eq!(lesson.order_index, 0);
    }

    #[tokio::test]
    async fn appended_lesson_gets_max_plus_one() {
        let db = memory_pool().await;
        let course_id = seed_course(&db, "C", 10.0, false).await;
        seed_lesson(&db, &course_id, "A", 0).await;
        // Gap in the sequence: max is what matters, not count
        seed_lesson(&db, &course_id, "B", 4).await;

        let lesson = insert_lesson(&db, &course_id, "C", "https://cdn.test/c.mp4")
            .await
            .unwrap();
        assert_eq!(lesson.order_index, 5);
    }

    #[tokio::test]
    async fn lessons_come_back_in_order() {
        let db = memory_pool().await;
        let course_id = seed_course(&db, "C", 10.0, false).await;
        seed_lesson(&db, &course_id, "Third", 2).await;
        seed_lesson(&db, &course_id, "First", 0).await;
        seed_lesson(&db, &course_id, "Second", 1).await;

        let lessons = ordered_lessons(&db, &course_id).await.unwrap();
        let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert!(lessons.windows(2).all(|w| w[0].order_index <= w[1].order_index));
    }
}
