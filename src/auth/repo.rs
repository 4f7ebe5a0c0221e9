use sqlx::PgPool;

pub use crate::auth::repo_types::User;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, is_verified, avatar_url, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password; starts unverified.
    pub async fn create(db: &PgPool, email: &str, hashed_password: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password)
            VALUES ($1, $2)
            RETURNING id, email, hashed_password, is_verified, avatar_url, created_at
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// One-way transition: unverified -> verified.
    pub async fn mark_verified(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_verified = TRUE
            WHERE email = $1
            RETURNING id, email, hashed_password, is_verified, avatar_url, created_at
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Overwrite the stored hash. Does not touch verification state.
    pub async fn set_password(
        db: &PgPool,
        email: &str,
        hashed_password: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET hashed_password = $2
            WHERE email = $1
            RETURNING id, email, hashed_password, is_verified, avatar_url, created_at
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_avatar_url(
        db: &PgPool,
        id: i64,
        avatar_url: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET avatar_url = $2
            WHERE id = $1
            RETURNING id, email, hashed_password, is_verified, avatar_url, created_at
            "#,
        )
        .bind(id)
        .bind(avatar_url)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
