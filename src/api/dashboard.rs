//! Learner dashboard: owned courses and payment history.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{AuthUser, Course, DbPool, PaymentWithCourse};
use crate::AppState;

use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// Courses the caller owns, merged from enrollments and approved
    /// payments and deduplicated by course.
    pub courses: Vec<Course>,
    pub payments: Vec<PaymentWithCourse>,
    pub total_spent: f64,
}

pub(crate) async fn owned_courses(db: &DbPool, user_id: &str) -> Result<Vec<Course>, ApiError> {
    // UNION deduplicates courses reachable through both tables.
    let courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT c.* FROM courses c
        JOIN purchases p ON p.course_id = c.id AND p.user_id = ?
        UNION
        SELECT c.* FROM courses c
        JOIN payments pay ON pay.course_id = c.id AND pay.user_id = ? AND pay.status = 'approved'
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(courses)
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let courses = owned_courses(&state.db, &user.id).await?;

    let payments = sqlx::query_as::<_, PaymentWithCourse>(
        r#"
        SELECT p.id, p.user_id, p.course_id, c.title AS course_title, p.phone_number,
               p.user_email, p.status, p.created_at, p.reviewed_at, p.reviewed_by
        FROM payments p
        JOIN courses c ON c.id = p.course_id
        WHERE p.user_id = ?
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let (total_spent,): (f64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(c.price), 0.0)
        FROM payments p
        JOIN courses c ON c.id = p.course_id
        WHERE p.user_id = ? AND p.status = 'approved'
        "#,
    )
    .bind(&user.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(DashboardResponse {
        courses,
        payments,
        total_spent,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ensure_enrollment;
    use crate::db::testing::{memory_pool, seed_course, seed_user};

    #[tokio::test]
    async fn owned_courses_merges_and_dedupes_both_sources() {
        let db = memory_pool().await;
        let user_id = seed_user(&db, "amina@example.com", "learner").await;
        let both = seed_course(&db, "Both sources", 10.0, false).await;
        let only_payment = seed_course(&db, "Approved only", 15.0, false).await;
        let unowned = seed_course(&db, "Unowned", 20.0, false).await;

        ensure_enrollment(&db, &user_id, &both).await.unwrap();
        for course in [&both, &only_payment] {
            sqlx::query(
                "INSERT INTO payments (id, user_id, course_id, phone_number, status) VALUES (?, ?, ?, '+252611234567', 'approved')",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&user_id)
            .bind(course)
            .execute(&db)
            .await
            .unwrap();
        }

        let courses = owned_courses(&db, &user_id).await.unwrap();
        let ids: Vec<&str> = courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(courses.len(), 2);
        assert!(ids.contains(&both.as_str()));
        assert!(ids.contains(&only_payment.as_str()));
        assert!(!ids.contains(&unowned.as_str()));
    }
}
