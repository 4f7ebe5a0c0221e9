use sqlx::PgPool;
use time::Date;

use crate::contacts::dto::{CreateContactRequest, UpdateContactRequest};
pub use crate::contacts::repo_types::Contact;
use crate::contacts::services::{birthday_window_keys, escape_like};

/// Inclusive upcoming-birthday window, in days past today.
pub const BIRTHDAY_WINDOW_DAYS: i64 = 7;

impl Contact {
    pub async fn create(
        db: &PgPool,
        owner_id: i64,
        fields: &CreateContactRequest,
    ) -> anyhow::Result<Contact> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (owner_id, first_name, last_name, email, phone, birthday, additional_info)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, first_name, last_name, email, phone, birthday, additional_info, created_at
            "#,
        )
        .bind(owner_id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(fields.birthday)
        .bind(&fields.additional_info)
        .fetch_one(db)
        .await?;
        Ok(contact)
    }

    /// Ownership is enforced in the WHERE clause: a contact owned by
    /// someone else is indistinguishable from a missing one.
    pub async fn get(db: &PgPool, owner_id: i64, id: i64) -> anyhow::Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, owner_id, first_name, last_name, email, phone, birthday, additional_info, created_at
            FROM contacts
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(contact)
    }

    pub async fn list(
        db: &PgPool,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, owner_id, first_name, last_name, email, phone, birthday, additional_info, created_at
            FROM contacts
            WHERE owner_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Partial update: absent fields keep their stored values.
    pub async fn update(
        db: &PgPool,
        owner_id: i64,
        id: i64,
        fields: &UpdateContactRequest,
    ) -> anyhow::Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET
                first_name      = COALESCE($3, first_name),
                last_name       = COALESCE($4, last_name),
                email           = COALESCE($5, email),
                phone           = COALESCE($6, phone),
                birthday        = COALESCE($7, birthday),
                additional_info = COALESCE($8, additional_info)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, first_name, last_name, email, phone, birthday, additional_info, created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(fields.birthday)
        .bind(&fields.additional_info)
        .fetch_optional(db)
        .await?;
        Ok(contact)
    }

    /// Deletes immediately and returns the prior record state.
    pub async fn delete(db: &PgPool, owner_id: i64, id: i64) -> anyhow::Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            DELETE FROM contacts
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, first_name, last_name, email, phone, birthday, additional_info, created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(contact)
    }

    /// Case-insensitive substring match over first name, last name and
    /// email (logical OR). Metacharacters in `q` match literally.
    pub async fn search(db: &PgPool, owner_id: i64, q: &str) -> anyhow::Result<Vec<Contact>> {
        let pattern = format!("%{}%", escape_like(q));
        let rows = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, owner_id, first_name, last_name, email, phone, birthday, additional_info, created_at
            FROM contacts
            WHERE owner_id = $1
              AND (first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .bind(pattern)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Contacts whose birthday (month/day) falls in `[today, today + 7]`,
    /// wrapping correctly across the year boundary.
    pub async fn upcoming_birthdays(
        db: &PgPool,
        owner_id: i64,
        today: Date,
    ) -> anyhow::Result<Vec<Contact>> {
        let keys = birthday_window_keys(today, BIRTHDAY_WINDOW_DAYS);
        let rows = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, owner_id, first_name, last_name, email, phone, birthday, additional_info, created_at
            FROM contacts
            WHERE owner_id = $1
              AND to_char(birthday, 'MM-DD') = ANY($2)
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .bind(keys)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
