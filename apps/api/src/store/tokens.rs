use chrono::Utc;
use rand::RngCore;
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::models::user::User;

const KEY_BYTES: usize = 20;

/// 40 lowercase hex characters from the OS RNG.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Returns the user's token, creating it on first use. Repeated calls return
/// the same key until the token is deleted.
pub async fn get_or_create(conn: &mut SqliteConnection, user_id: i64) -> Result<String, sqlx::Error> {
    if let Some(key) = find_key_for_user(&mut *conn, user_id).await? {
        return Ok(key);
    }

    sqlx::query(
        "INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?, ?, ?) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(generate_key())
    .bind(user_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    // Re-read so a concurrent insert for the same user wins consistently.
    sqlx::query_scalar("SELECT key FROM auth_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
}

pub async fn find_key_for_user(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT key FROM auth_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Resolves a presented key to its owner.
pub async fn find_user_by_key(
    executor: impl SqliteExecutor<'_>,
    key: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "SELECT users.* FROM auth_tokens JOIN users ON users.id = auth_tokens.user_id WHERE auth_tokens.key = ?",
    )
    .bind(key)
    .fetch_optional(executor)
    .await
}

/// Deletes the user's token, returning whether one existed.
pub async fn delete_for_user(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::user::UserRole;
    use crate::store::users::{self, NewUser};

    async fn seed_user(pool: &sqlx::SqlitePool) -> User {
        users::insert(
            pool,
            NewUser {
                email: "token@example.com",
                first_name: "Tok",
                last_name: "En",
                user_type: UserRole::User,
                password_hash: "$argon2id$stub",
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_generate_key_shape() {
        let key = generate_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_key());
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create(&mut conn, user.id).await.unwrap();
        let second = get_or_create(&mut conn, user.id).await.unwrap();
        assert_eq!(first, second);

        let owner = find_user_by_key(&mut *conn, &first).await.unwrap().unwrap();
        assert_eq!(owner.id, user.id);
    }

    #[tokio::test]
    async fn test_delete_then_recreate_issues_new_key() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create(&mut conn, user.id).await.unwrap();
        assert!(delete_for_user(&mut *conn, user.id).await.unwrap());
        assert!(!delete_for_user(&mut *conn, user.id).await.unwrap());
        assert!(find_user_by_key(&mut *conn, &first).await.unwrap().is_none());

        let second = get_or_create(&mut conn, user.id).await.unwrap();
        assert_ne!(first, second);
    }
}
