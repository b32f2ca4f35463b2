//! Course catalog and admin course CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::access;
use crate::db::{
    AuthUser, Course, CourseSummary, CreateCourseRequest, DbPool, LessonOutline,
    UpdateCourseRequest,
};
use crate::AppState;

use super::auth::AdminUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_description, validate_media_url, validate_price, validate_title, validate_uuid,
};

/// Course detail page payload: lesson outlines only, so video URLs never
/// leave the server for viewers without access.
#[derive(Debug, Serialize)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: Course,
    pub lessons: Vec<LessonOutline>,
    pub has_access: bool,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub allowed: bool,
}

pub(crate) async fn fetch_course(db: &DbPool, id: &str) -> Result<Course, ApiError> {
    if let Err(e) = validate_uuid(id, "course_id") {
        return Err(ApiError::validation_field("course_id", e));
    }

    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))
}

/// GET /api/courses
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CourseSummary>>, ApiError> {
    let courses = sqlx::query_as::<_, CourseSummary>(
        r#"
        SELECT c.id, c.title, c.description, c.price, c.is_free, c.thumbnail_url,
               c.created_at, COUNT(l.id) AS lesson_count
        FROM courses c
        LEFT JOIN lessons l ON l.course_id = c.id
        GROUP BY c.id
        ORDER BY c.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(courses))
}

/// GET /api/courses/:id
///
/// Anonymous viewers get `has_access: false`; the access check (including
/// free-course auto-enroll) runs only for authenticated callers.
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let course = fetch_course(&state.db, &id).await?;

    let lessons = sqlx::query_as::<_, LessonOutline>(
        "SELECT id, title, order_index FROM lessons WHERE course_id = ? ORDER BY order_index ASC",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    let has_access = match &user {
        Some(user) => access::course_access(&state.db, &user.id, &course).await?,
        None => false,
    };

    Ok(Json(CourseDetailResponse {
        course,
        lessons,
        has_access,
    }))
}

/// GET /api/courses/:id/access
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<Json<AccessResponse>, ApiError> {
    let course = fetch_course(&state.db, &id).await?;
    let allowed = access::course_access(&state.db, &user.id, &course).await?;
    Ok(Json(AccessResponse { allowed }))
}

fn validate_create_request(req: &CreateCourseRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_title(&req.title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_price(req.price, req.is_free) {
        errors.add("price", e);
    }
    if let Some(url) = req.thumbnail_url.as_deref().filter(|u| !u.is_empty()) {
        if let Err(e) = validate_media_url(url) {
            errors.add("thumbnail_url", e);
        }
    }

    for (i, lesson) in req.lessons.iter().enumerate() {
        if let Err(e) = validate_title(&lesson.title) {
            errors.add(format!("lessons[{i}].title"), e);
        }
        if let Err(e) = validate_media_url(&lesson.video_url) {
            errors.add(format!("lessons[{i}].video_url"), e);
        }
    }

    errors.finish()
}

/// Create a course and its initial lessons atomically.
pub(crate) async fn insert_course(
    db: &DbPool,
    req: &CreateCourseRequest,
) -> Result<Course, ApiError> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let price = if req.is_free { 0.0 } else { req.price };
    let thumbnail_url = req.thumbnail_url.as_deref().filter(|u| !u.is_empty());

    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO courses (id, title, description, price, is_free, thumbnail_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(price)
    .bind(req.is_free)
    .bind(thumbnail_url)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for (i, lesson) in req.lessons.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO lessons (id, course_id, title, video_url, order_index, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(lesson.title.trim())
        .bind(lesson.video_url.trim())
        .bind(i as i64)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
        .bind(&id)
        .fetch_one(db)
        .await?;
    Ok(course)
}

/// POST /api/admin/courses
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    validate_create_request(&req)?;

    let course = insert_course(&state.db, &req).await?;
    tracing::info!(course = %course.id, title = %course.title, admin = %admin.id, "Course created");

    Ok((StatusCode::CREATED, Json(course)))
}

/// Merge semantics for optional text columns:
/// - None -> keep existing
/// - Some("") -> clear
/// - Some(value) -> set
fn merge_optional_string(new_val: &Option<String>, existing: &Option<String>) -> Option<String> {
    match new_val {
        Some(s) if s.is_empty() => None,
        Some(s) => Some(s.clone()),
        None => existing.clone(),
    }
}

/// PUT /api/admin/courses/:id
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, ApiError> {
    let existing = fetch_course(&state.db, &id).await?;

    let title = req.title.clone().unwrap_or(existing.title.clone());
    let description = req
        .description
        .clone()
        .unwrap_or(existing.description.clone());
    let is_free = req.is_free.unwrap_or(existing.is_free);
    let price = if is_free {
        0.0
    } else {
        req.price.unwrap_or(existing.price)
    };
    let thumbnail_url = merge_optional_string(&req.thumbnail_url, &existing.thumbnail_url);

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_title(&title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_description(&description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_price(price, is_free) {
        errors.add("price", e);
    }
    if let Some(url) = thumbnail_url.as_deref() {
        if let Err(e) = validate_media_url(url) {
            errors.add("thumbnail_url", e);
        }
    }
    errors.finish()?;

    sqlx::query(
        r#"
        UPDATE courses SET
            title = ?,
            description = ?,
            price = ?,
            is_free = ?,
            thumbnail_url = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title.trim())
    .bind(description.trim())
    .bind(price)
    .bind(is_free)
    .bind(&thumbnail_url)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(course))
}

/// Delete a course and everything hanging off it in one transaction.
/// Media objects in storage are left behind on purpose; bucket lifecycle
/// rules own blob retention.
pub(crate) async fn delete_course_cascade(db: &DbPool, id: &str) -> Result<(), ApiError> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM lessons WHERE course_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM payments WHERE course_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM purchases WHERE course_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// DELETE /api/admin/courses/:id
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let course = fetch_course(&state.db, &id).await?;

    delete_course_cascade(&state.db, &course.id).await?;
    tracing::info!(course = %course.id, title = %course.title, admin = %admin.id, "Course deleted");

    Ok(StatusCode::NO_CONTENT)
}
