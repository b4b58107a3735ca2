use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;

/// Connect, create the keyspace and the wallets table if missing, and switch
/// the session to the keyspace
pub async fn connect(node: &str, keyspace: &str) -> anyhow::Result<Arc<Session>> {
    tracing::info!(node = node, keyspace = keyspace, "Connecting to ScyllaDB...");

    let session: Session = SessionBuilder::new().known_node(node).build().await?;

    session
        .query_unpaged(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                keyspace
            ),
            &[],
        )
        .await?;

    session.use_keyspace(keyspace, false).await?;

    session
        .query_unpaged(
            "CREATE TABLE IF NOT EXISTS wallets (\
                id text PRIMARY KEY, \
                balance text, \
                currency text, \
                created_at timestamp, \
                version bigint)",
            &[],
        )
        .await?;

    Ok(Arc::new(session))
}
