mod models;

pub use models::*;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("durus.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: courses, lessons, payments, purchases
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: users and sessions
    execute_sql(pool, include_str!("../../migrations/002_users.sql")).await?;

    info!("Migrations completed");
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory pool running the real migrations. One connection so every
    /// query sees the same database.
    pub async fn memory_pool() -> DbPool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    pub async fn seed_user(pool: &DbPool, email: &str, role: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO users (id, email, password_hash, name, role) VALUES (?, ?, '', ?, ?)")
            .bind(&id)
            .bind(email)
            .bind(email.split('@').next().unwrap_or("user"))
            .bind(role)
            .execute(pool)
            .await
            .unwrap();
        id
    }

    pub async fn seed_course(pool: &DbPool, title: &str, price: f64, is_free: bool) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO courses (id, title, description, price, is_free) VALUES (?, ?, 'seed', ?, ?)",
        )
        .bind(&id)
        .bind(title)
        .bind(price)
        .bind(is_free)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    pub async fn seed_lesson(pool: &DbPool, course_id: &str, title: &str, order_index: i64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO lessons (id, course_id, title, video_url, order_index) VALUES (?, ?, ?, 'https://example.com/v.mp4', ?)",
        )
        .bind(&id)
        .bind(course_id)
        .bind(title)
        .bind(order_index)
        .execute(pool)
        .await
        .unwrap();
        id
    }
}
