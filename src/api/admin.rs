//! Admin console overview.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::db::PaymentWithCourse;
use crate::AppState;

use super::auth::AdminUser;
use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub total_courses: i64,
    /// Distinct users that have submitted at least one payment claim.
    pub total_users: i64,
    /// Sum of course prices over approved payments.
    pub total_revenue: f64,
    pub pending_payments: i64,
    pub recent_payments: Vec<PaymentWithCourse>,
}

/// GET /api/admin/overview
pub async fn overview(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<OverviewResponse>, ApiError> {
    let (total_courses,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM courses")
        .fetch_one(&state.db)
        .await?;

    let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT user_id) FROM payments")
        .fetch_one(&state.db)
        .await?;

    let (total_revenue,): (f64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(c.price), 0.0)
        FROM payments p
        JOIN courses c ON c.id = p.course_id
        WHERE p.status = 'approved'
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    let (pending_payments,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payments WHERE status = 'pending'")
            .fetch_one(&state.db)
            .await?;

    let recent_payments = sqlx::query_as::<_, PaymentWithCourse>(
        r#"
        SELECT p.id, p.user_id, p.course_id, c.title AS course_title, p.phone_number,
               p.user_email, p.status, p.created_at, p.reviewed_at, p.reviewed_by
        FROM payments p
        JOIN courses c ON c.id = p.course_id
        ORDER BY p.created_at DESC
        LIMIT 5
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(OverviewResponse {
        total_courses,
        total_users,
        total_revenue,
        pending_payments,
        recent_payments,
    }))
}

#[cfg(test)]
mod tests {
    use crate::db::testing::{memory_pool, seed_course, seed_user};

    #[tokio::test]
    async fn revenue_counts_only_approved_payments() {
        let db = memory_pool().await;
        let user_a = seed_user(&db, "a@example.com", "learner").await;
        let user_b = seed_user(&db, "b@example.com", "learner").await;
        let course = seed_course(&db, "C", 25.0, false).await;

        for (user, status) in [
            (&user_a, "approved"),
            (&user_a, "pending"),
            (&user_b, "rejected"),
        ] {
            sqlx::query(
                "INSERT INTO payments (id, user_id, course_id, phone_number, status) VALUES (?, ?, ?, '+252611234567', ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(user)
            .bind(&course)
            .bind(status)
            .execute(&db)
            .await
            .unwrap();
        }

        let (revenue,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(c.price), 0.0) FROM payments p JOIN courses c ON c.id = p.course_id WHERE p.status = 'approved'",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(revenue, 25.0);

        let (payers,): (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT user_id) FROM payments")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(payers, 2);
    }
}
