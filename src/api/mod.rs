mod admin;
pub mod auth;
mod courses;
mod dashboard;
pub mod error;
mod lessons;
mod oauth;
mod payments;
mod uploads;
mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/session", get(auth::session).delete(auth::logout))
        .route("/oauth/google", get(oauth::google_authorize))
        .route("/oauth/google/callback", get(oauth::google_callback));

    // Learner-facing API; course reads are public, everything user-specific
    // authenticates through the extractors.
    let api_routes = Router::new()
        .route("/courses", get(courses::list_courses))
        .route("/courses/:id", get(courses::get_course))
        .route("/courses/:id/access", get(courses::check_access))
        .route("/courses/:id/lessons", get(lessons::list_lessons))
        .route(
            "/courses/:course_id/lessons/:lesson_id",
            get(lessons::get_lesson),
        )
        .route("/courses/:id/payments", post(payments::submit_payment))
        .route("/courses/:id/payments/latest", get(payments::latest_payment))
        .route("/dashboard", get(dashboard::dashboard));

    // Admin console, gated by the AdminUser extractor in every handler
    let admin_routes = Router::new()
        .route("/overview", get(admin::overview))
        .route("/payments", get(payments::list_payments))
        .route("/payments/:id/approve", post(payments::approve_payment))
        .route("/payments/:id/reject", post(payments::reject_payment))
        .route("/payments/:id/cancel", post(payments::cancel_payment))
        .route("/courses", post(courses::create_course))
        .route(
            "/courses/:id",
            put(courses::update_course).delete(courses::delete_course),
        )
        .route("/courses/:id/lessons", post(lessons::create_lesson))
        .route(
            "/lessons/:id",
            put(lessons::update_lesson).delete(lessons::delete_lesson),
        )
        .route("/uploads/videos", post(uploads::upload_video))
        .route("/uploads/thumbnails", post(uploads::upload_thumbnail))
        .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BODY));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
