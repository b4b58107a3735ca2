use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Script;

use super::{Operation, RepositoryError, WalletRepository};
use crate::domain::wallet::{Wallet, WalletId, WalletSnapshot};

// ============================================================================
// Redis Wallet Repository - Document Store
// ============================================================================
//
// Each wallet is a JSON document under `wallet:{id}`. Updates replace the
// whole document through a Lua script that compares the stored version
// first; Redis runs scripts atomically, so the compare and the replace
// cannot interleave with another writer.
//
// Script results: 1 = replaced, 0 = version mismatch, -1 = no document.
//
// ============================================================================

const KEY_PREFIX: &str = "wallet:";

const REPLACE_IF_VERSION_MATCHES: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return -1
end
local document = cjson.decode(current)
if tonumber(document['version']) ~= tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2])
return 1
"#;

pub struct RedisWalletRepository {
    connection: MultiplexedConnection,
    replace_script: Script,
}

impl RedisWalletRepository {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self {
            connection,
            replace_script: Script::new(REPLACE_IF_VERSION_MATCHES),
        }
    }

    fn key(wallet_id: &WalletId) -> String {
        format!("{}{}", KEY_PREFIX, wallet_id)
    }
}

#[async_trait]
impl WalletRepository for RedisWalletRepository {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn create(&self, wallet: &Wallet) -> Result<(), RepositoryError> {
        let document = serde_json::to_string(&wallet.to_snapshot())
            .map_err(|e| RepositoryError::storage(Operation::Create, e))?;

        let mut connection = self.connection.clone();
        let inserted: Option<String> = redis::cmd("SET")
            .arg(Self::key(wallet.id()))
            .arg(document)
            .arg("NX")
            .query_async(&mut connection)
            .await
            .map_err(|e| RepositoryError::storage(Operation::Create, e))?;

        if inserted.is_none() {
            return Err(RepositoryError::storage(
                Operation::Create,
                redis::RedisError::from((
                    redis::ErrorKind::ResponseError,
                    "wallet document already exists",
                    wallet.id().to_string(),
                )),
            ));
        }

        tracing::debug!(wallet_id = %wallet.id(), "Stored wallet document");
        Ok(())
    }

    async fn get(&self, wallet_id: &WalletId) -> Result<Wallet, RepositoryError> {
        let mut connection = self.connection.clone();
        let document: Option<String> = redis::cmd("GET")
            .arg(Self::key(wallet_id))
            .query_async(&mut connection)
            .await
            .map_err(|e| RepositoryError::storage(Operation::Get, e))?;

        let document = document.ok_or_else(|| RepositoryError::NotFound(wallet_id.clone()))?;

        let snapshot: WalletSnapshot = serde_json::from_str(&document)
            .map_err(|e| RepositoryError::storage(Operation::Get, e))?;

        Wallet::from_snapshot(snapshot).map_err(|e| RepositoryError::storage(Operation::Get, e))
    }

    async fn update(&self, wallet: &mut Wallet) -> Result<(), RepositoryError> {
        let mut next = wallet.to_snapshot();
        next.version = wallet.version().next();
        let document =
            serde_json::to_string(&next).map_err(|e| RepositoryError::storage(Operation::Update, e))?;

        let mut connection = self.connection.clone();
        let outcome: i64 = self
            .replace_script
            .key(Self::key(wallet.id()))
            .arg(wallet.version().value())
            .arg(document)
            .invoke_async(&mut connection)
            .await
            .map_err(|e| RepositoryError::storage(Operation::Update, e))?;

        match outcome {
            1 => {
                wallet.advance_version();
                tracing::debug!(wallet_id = %wallet.id(), version = %wallet.version(), "Replaced wallet document");
                Ok(())
            }
            0 => {
                tracing::warn!(
                    wallet_id = %wallet.id(),
                    expected_version = %wallet.version(),
                    "Optimistic lock conflict on wallet document"
                );
                Err(RepositoryError::OptimisticLock {
                    wallet_id: wallet.id().clone(),
                    expected: wallet.version(),
                })
            }
            _ => Err(RepositoryError::NotFound(wallet.id().clone())),
        }
    }
}

// ============================================================================
// Integration Tests
// ============================================================================
