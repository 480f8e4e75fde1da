use sqlx::postgres::PgArguments;
use sqlx::query::{Query, QueryAs};
use sqlx::{PgPool, Postgres};
use tracing::error;

use crate::invites::store::{FieldValue, InviteField, InviteStore, StoreError};
use crate::models::invites::{InviteId, InviteLink, NewInviteLink};

const INVITE_COLUMNS: &str = "id, code, user_id, event, is_used, created_at, expires_at";

/// Invite documents kept in the `invite_links` table.
#[derive(Clone)]
pub struct PgInviteStore {
    pool: PgPool,
}

impl PgInviteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        error!("Database error ({}): {:?}", context, e);
        StoreError::Backend(format!("{}: {}", context, e))
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q FieldValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        FieldValue::Text(text) => query.bind(text.as_str()),
        FieldValue::Event(event) => query.bind(*event),
        FieldValue::Bool(flag) => query.bind(*flag),
    }
}

fn bind_value_as<'q>(
    query: QueryAs<'q, Postgres, InviteLink, PgArguments>,
    value: &'q FieldValue,
) -> QueryAs<'q, Postgres, InviteLink, PgArguments> {
    match value {
        FieldValue::Text(text) => query.bind(text.as_str()),
        FieldValue::Event(event) => query.bind(*event),
        FieldValue::Bool(flag) => query.bind(*flag),
    }
}

#[async_trait::async_trait]
impl InviteStore for PgInviteStore {
    async fn insert(&self, record: &NewInviteLink) -> Result<InviteId, StoreError> {
        sqlx::query_scalar::<_, InviteId>(
            r#"
            INSERT INTO invite_links (code, user_id, event, is_used, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&record.code)
        .bind(&record.user_id)
        .bind(record.event)
        .bind(record.is_used)
        .bind(record.created_at)
        .bind(record.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(backend_error("insert_invite"))
    }

    async fn find_by_field(
        &self,
        field: InviteField,
        value: &FieldValue,
    ) -> Result<Vec<InviteLink>, StoreError> {
        field.check(value)?;
        // Column names come from a closed enum, never from input.
        let sql = format!(
            "SELECT {} FROM invite_links WHERE {} = $1 ORDER BY created_at ASC, id ASC",
            INVITE_COLUMNS,
            field.column()
        );
        bind_value_as(sqlx::query_as::<_, InviteLink>(&sql), value)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error("find_invites_by_field"))
    }

    async fn update_field(
        &self,
        id: InviteId,
        field: InviteField,
        value: &FieldValue,
    ) -> Result<(), StoreError> {
        field.check(value)?;
        let sql = format!("UPDATE invite_links SET {} = $1 WHERE id = $2", field.column());
        let result = bind_value(sqlx::query(&sql), value)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_error("update_invite_field"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRecord(id));
        }
        Ok(())
    }

    async fn update_field_if(
        &self,
        id: InviteId,
        field: InviteField,
        expected: &FieldValue,
        value: &FieldValue,
    ) -> Result<bool, StoreError> {
        field.check(expected)?;
        field.check(value)?;
        // Single statement: Postgres row locking makes the compare and the write atomic.
        let sql = format!(
            "UPDATE invite_links SET {column} = $1 WHERE id = $2 AND {column} = $3",
            column = field.column()
        );
        let result = bind_value(bind_value(sqlx::query(&sql), value).bind(id), expected)
            .execute(&self.pool)
            .await
            .map_err(backend_error("conditional_update_invite_field"))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM invite_links WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(backend_error("invite_exists"))?;
        if exists {
            Ok(false)
        } else {
            Err(StoreError::MissingRecord(id))
        }
    }
}
