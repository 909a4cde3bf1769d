use chrono::Utc;
use sqlx::SqliteExecutor;
use tracing::info;

use crate::models::user::{User, UserRole};

/// Columns for a new `users` row. `email` must already be normalized.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub user_type: UserRole,
    pub password_hash: &'a str,
}

pub async fn find_by_email(
    executor: impl SqliteExecutor<'_>,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_firebase_uid(
    executor: impl SqliteExecutor<'_>,
    firebase_uid: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE firebase_uid = ?")
        .bind(firebase_uid)
        .fetch_optional(executor)
        .await
}

/// Inserts a user with no external UID. Fails with a unique violation on a
/// duplicate email.
pub async fn insert(
    executor: impl SqliteExecutor<'_>,
    new_user: NewUser<'_>,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users
            (email, first_name, last_name, user_type, password_hash, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_user.email)
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.user_type)
    .bind(new_user.password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    info!("Inserted user {} ({})", user.id, user.email);
    Ok(user)
}

/// Records the identity provider's UID on an existing row.
pub async fn attach_firebase_uid(
    executor: impl SqliteExecutor<'_>,
    id: i64,
    firebase_uid: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as(
        "UPDATE users SET firebase_uid = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(firebase_uid)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(executor)
    .await
}

pub async fn record_login(
    executor: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<User, sqlx::Error> {
    sqlx::query_as("UPDATE users SET last_login = ? WHERE id = ? RETURNING *")
        .bind(Utc::now())
        .bind(id)
        .fetch_one(executor)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::store::is_unique_violation;

    fn new_user<'a>(email: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            first_name: "Grace",
            last_name: "Hopper",
            user_type: UserRole::User,
            password_hash: "$argon2id$stub",
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = test_pool().await;
        let user = insert(&pool, new_user("grace@example.com")).await.unwrap();
        assert!(user.is_active);
        assert!(user.firebase_uid.is_none());
        assert!(user.last_login.is_none());

        let by_email = find_by_email(&pool, "grace@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.email, "grace@example.com");
        assert!(find_by_email(&pool, "nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let pool = test_pool().await;
        insert(&pool, new_user("dup@example.com")).await.unwrap();
        let err = insert(&pool, new_user("dup@example.com")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_firebase_uid_is_unique_when_present() {
        let pool = test_pool().await;
        let a = insert(&pool, new_user("a@example.com")).await.unwrap();
        let b = insert(&pool, new_user("b@example.com")).await.unwrap();
        // Several rows without a UID are fine.
        let a = attach_firebase_uid(&pool, a.id, "uid-1").await.unwrap();
        assert_eq!(a.firebase_uid.as_deref(), Some("uid-1"));

        let err = attach_firebase_uid(&pool, b.id, "uid-1").await.unwrap_err();
        assert!(is_unique_violation(&err));

        let found = find_by_firebase_uid(&pool, "uid-1").await.unwrap().unwrap();
        assert_eq!(found.id, a.id);
    }

    #[tokio::test]
    async fn test_record_login_sets_last_login() {
        let pool = test_pool().await;
        let user = insert(&pool, new_user("login@example.com")).await.unwrap();
        let user = record_login(&pool, user.id).await.unwrap();
        assert!(user.last_login.is_some());
    }
}
