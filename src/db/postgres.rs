use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS wallets (
        id TEXT PRIMARY KEY,
        balance NUMERIC NOT NULL CHECK (balance >= 0),
        currency TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        version BIGINT NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS outbox_messages (
        id UUID PRIMARY KEY,
        position BIGSERIAL NOT NULL,
        occurred_at TIMESTAMPTZ NOT NULL,
        type TEXT NOT NULL,
        payload JSONB NOT NULL,
        processed_at TIMESTAMPTZ NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_outbox_messages_pending
    ON outbox_messages (occurred_at, position)
    WHERE processed_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS library_cards (
        id UUID PRIMARY KEY,
        owner_id UUID NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rentals (
        id UUID PRIMARY KEY,
        card_id UUID NOT NULL REFERENCES library_cards (id) ON DELETE CASCADE,
        resource_id UUID NOT NULL,
        starts_at TIMESTAMPTZ NOT NULL,
        ends_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    tracing::info!(max_connections = max_connections, "Connecting to PostgreSQL...");

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await
}

/// Create every table the crate uses. Safe to run repeatedly.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!(statements = MIGRATIONS.len(), "PostgreSQL schema ready");
    Ok(())
}
