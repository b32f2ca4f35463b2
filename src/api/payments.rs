//! Mobile-money payment claims: learner submission and admin review.
//!
//! Review transitions and their enrollment side effects run in one
//! transaction, so a payment's status and the purchases table cannot
//! diverge on a crash between the two writes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    AuthUser, DbPool, Payment, PaymentStatusResponse, PaymentWithCourse, ReviewAction,
    SubmitPaymentRequest,
};
use crate::AppState;

use super::auth::AdminUser;
use super::courses::fetch_course;
use super::error::ApiError;
use super::validation::validate_phone_number;

/// POST /api/courses/:id/payments
pub async fn submit_payment(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
    user: AuthUser,
    Json(req): Json<SubmitPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let course = fetch_course(&state.db, &course_id).await?;

    if course.is_free {
        return Err(ApiError::bad_request("This course is free and needs no payment"));
    }

    if let Err(e) = validate_phone_number(&req.phone_number) {
        return Err(ApiError::validation_field("phone_number", e));
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO payments (id, user_id, course_id, phone_number, user_email, status, created_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&course.id)
    .bind(req.phone_number.trim())
    .bind(&user.email)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    tracing::info!(payment = %id, course = %course.id, user = %user.id, "Payment claim submitted");

    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /api/courses/:id/payments/latest
///
/// Always 200: `payment` is null when the caller has not submitted one,
/// and the receiving number is included either way so the purchase page
/// can render its instructions.
pub async fn latest_payment(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
    user: AuthUser,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let course = fetch_course(&state.db, &course_id).await?;

    let payment = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE user_id = ? AND course_id = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(&user.id)
    .bind(&course.id)
    .fetch_optional(&state.db)
    .await?;

    Ok(Json(PaymentStatusResponse {
        payment,
        receiver_number: state.config.payment.receiver_number.clone(),
    }))
}

/// GET /api/admin/payments
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<PaymentWithCourse>>, ApiError> {
    let payments = sqlx::query_as::<_, PaymentWithCourse>(
        r#"
        SELECT p.id, p.user_id, p.course_id, c.title AS course_title, p.phone_number,
               p.user_email, p.status, p.created_at, p.reviewed_at, p.reviewed_by
        FROM payments p
        JOIN courses c ON c.id = p.course_id
        ORDER BY p.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(payments))
}

/// Apply a review action: status change plus enrollment side effect in one
/// transaction. Approve also covers reactivation of rejected/cancelled
/// claims; the enrollment insert is idempotent so a surviving row from an
/// earlier approval does not fail the transition.
pub(crate) async fn apply_review(
    db: &DbPool,
    payment_id: &str,
    action: ReviewAction,
    reviewer_id: &str,
) -> Result<Payment, ApiError> {
    let mut tx = db.begin().await?;

    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?")
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment not found"))?;

    let current = payment.status();
    if !action.allowed_from(current) {
        return Err(ApiError::conflict(format!(
            "Cannot {} a {} payment",
            action.as_str(),
            current
        )));
    }

    sqlx::query("UPDATE payments SET status = ?, reviewed_at = ?, reviewed_by = ? WHERE id = ?")
        .bind(action.target().as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(reviewer_id)
        .bind(payment_id)
        .execute(&mut *tx)
        .await?;

    match action {
        ReviewAction::Approve => {
            sqlx::query(
                "INSERT INTO purchases (id, user_id, course_id) VALUES (?, ?, ?)
                 ON CONFLICT(user_id, course_id) DO NOTHING",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&payment.user_id)
            .bind(&payment.course_id)
            .execute(&mut *tx)
            .await?;
        }
        ReviewAction::Cancel => {
            sqlx::query("DELETE FROM purchases WHERE user_id = ? AND course_id = ?")
                .bind(&payment.user_id)
                .bind(&payment.course_id)
                .execute(&mut *tx)
                .await?;
        }
        ReviewAction::Reject => {}
    }

    tx.commit().await?;

    let updated = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?")
        .bind(payment_id)
        .fetch_one(db)
        .await?;
    Ok(updated)
}

async fn review(
    state: &AppState,
    admin: &AuthUser,
    payment_id: &str,
    action: ReviewAction,
) -> Result<Json<Payment>, ApiError> {
    let payment = apply_review(&state.db, payment_id, action, &admin.id).await?;
    tracing::info!(
        payment = %payment.id,
        action = action.as_str(),
        status = %payment.status,
        admin = %admin.id,
        "Payment reviewed"
    );
    Ok(Json(payment))
}

/// POST /api/admin/payments/:id/approve
pub async fn approve_payment(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    review(&state, &admin, &id, ReviewAction::Approve).await
}

/// POST /api/admin/payments/:id/reject
pub async fn reject_payment(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    review(&state, &admin, &id, ReviewAction::Reject).await
}

/// POST /api/admin/payments/:id/cancel
pub async fn cancel_payment(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    review(&state, &admin, &id, ReviewAction::Cancel).await
}
