//! The lesson access gate.
//!
//! A user may view a course's lessons iff the course is free, an enrollment
//! row exists for the pair, or an approved payment exists for the pair.
//! Free courses auto-enroll the viewer so they show up on the dashboard.

use tracing::warn;

use crate::db::{Course, DbPool};

/// Idempotent enrollment insert; the UNIQUE(user_id, course_id) constraint
/// absorbs repeats.
pub async fn ensure_enrollment(db: &DbPool, user_id: &str, course_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO purchases (id, user_id, course_id) VALUES (?, ?, ?)
         ON CONFLICT(user_id, course_id) DO NOTHING",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(course_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn has_enrollment(db: &DbPool, user_id: &str, course_id: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT id FROM purchases WHERE user_id = ? AND course_id = ?")
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

pub async fn has_approved_payment(
    db: &DbPool,
    user_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM payments WHERE user_id = ? AND course_id = ? AND status = 'approved'",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

/// Whether `user_id` may view the lessons of `course`.
///
/// The free-course auto-enroll is best effort: a failed insert is logged and
/// access is granted anyway. Read errors propagate.
pub async fn course_access(db: &DbPool, user_id: &str, course: &Course) -> Result<bool, sqlx::Error> {
    if course.is_free {
        if let Err(e) = ensure_enrollment(db, user_id, &course.id).await {
            warn!(course = %course.id, user = %user_id, error = %e, "Free-course auto-enroll failed");
        }
        return Ok(true);
    }

    if has_enrollment(db, user_id, &course.id).await? {
        return Ok(true);
    }

    has_approved_payment(db, user_id, &course.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{memory_pool, seed_course, seed_user};

    async fn fetch_course(db: &DbPool, id: &str) -> Course {
        sqlx::query_as("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn free_course_grants_access_and_auto_enrolls() {
        let db = memory_pool().await;
        let user_id = seed_user(&db, "amina@example.com", "learner").await;
        let course_id = seed_course(&db, "Intro", 0.0, true).await;
        let course = fetch_course(&db, &course_id).await;

        assert!(course_access(&db, &user_id, &course).await.unwrap());
        assert!(has_enrollment(&db, &user_id, &course_id).await.unwrap());

        // Second check is idempotent: still exactly one enrollment row.
        assert!(course_access(&db, &user_id, &course).await.unwrap());
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE user_id = ? AND course_id = ?")
                .bind(&user_id)
                .bind(&course_id)
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn paid_course_without_records_is_denied() {
        let db = memory_pool().await;
        let user_id = seed_user(&db, "amina@example.com", "learner").await;
        let course_id = seed_course(&db, "Advanced", 25.0, false).await;
        let course = fetch_course(&db, &course_id).await;

        assert!(!course_access(&db, &user_id, &course).await.unwrap());
        assert!(!has_enrollment(&db, &user_id, &course_id).await.unwrap());
    }

    #[tokio::test]
    async fn enrollment_row_grants_access() {
        let db = memory_pool().await;
        let user_id = seed_user(&db, "amina@example.com", "learner").await;
        let course_id = seed_course(&db, "Advanced", 25.0, false).await;
        ensure_enrollment(&db, &user_id, &course_id).await.unwrap();
        let course = fetch_course(&db, &course_id).await;

        assert!(course_access(&db, &user_id, &course).await.unwrap());
    }

    #[tokio::test]
    async fn approved_payment_grants_access_without_enrollment() {
        let db = memory_pool().await;
        let user_id = seed_user(&db, "amina@example.com", "learner").await;
        let course_id = seed_course(&db, "Advanced", 25.0, false).await;
        sqlx::query(
            "INSERT INTO payments (id, user_id, course_id, phone_number, status) VALUES (?, ?, ?, '+252611234567', 'approved')",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(&course_id)
        .execute(&db)
        .await
        .unwrap();
        let course = fetch_course(&db, &course_id).await;

        assert!(course_access(&db, &user_id, &course).await.unwrap());
    }

    #[tokio::test]
    async fn pending_payment_does_not_grant_access() {
        let db = memory_pool().await;
        let user_id = seed_user(&db, "amina@example.com", "learner").await;
        let course_id = seed_course(&db, "Advanced", 25.0, false).await;
        sqlx::query(
            "INSERT INTO payments (id, user_id, course_id, phone_number, status) VALUES (?, ?, ?, '+252611234567', 'pending')",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(&course_id)
        .execute(&db)
        .await
        .unwrap();
        let course = fetch_course(&db, &course_id).await;

        assert!(!course_access(&db, &user_id, &course).await.unwrap());
    }
}
