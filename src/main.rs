use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wallet_outbox::config::{AppConfig, WalletBackend};
use wallet_outbox::db;
use wallet_outbox::domain::library::{DateRange, EntityId, LibraryCardService};
use wallet_outbox::domain::wallet::{Currency, WalletService};
use wallet_outbox::messaging::InProcessEventBus;
use wallet_outbox::metrics::{self, Metrics};
use wallet_outbox::notifications::register_library_events;
use wallet_outbox::outbox::{
    EventRegistry, InMemoryMessageOutbox, MessageOutbox, OutboxProcessor, PostgresMessageOutbox,
    StoreAndForwardPublisher,
};
use wallet_outbox::persistence::library::{
    InMemoryLibraryCardRepository, LibraryCardRepository, PostgresLibraryCardRepository,
};
use wallet_outbox::persistence::wallet::{
    InMemoryWalletRepository, PostgresWalletRepository, RedisWalletRepository, ScyllaWalletRepository,
    WalletRepository,
};
use wallet_outbox::persistence::{InMemoryDatabase, InMemoryUnitOfWork, PgUnitOfWork, UnitOfWork};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wallet_outbox=debug"))
        )
        .init();

    tracing::info!("🚀 Starting wallet & outbox demo");

    let config = AppConfig::from_env()?;
    tracing::info!(
        wallet_backend = ?config.wallet_backend,
        postgres = config.database_url.is_some(),
        commit_mode = ?config.outbox.commit_mode,
        "Configuration loaded"
    );

    // === 1. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let metrics_registry = metrics.registry().clone();
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Metrics runtime error: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 2. PostgreSQL (optional) ===
    let pool = match &config.database_url {
        Some(url) => {
            let pool = db::postgres::connect(url, config.database_max_connections).await?;
            db::postgres::run_migrations(&pool).await?;
            Some(pool)
        }
        None => None,
    };

    // === 3. Wallets with optimistic locking ===
    let repository: Arc<dyn WalletRepository> = match config.wallet_backend {
        WalletBackend::Memory => Arc::new(InMemoryWalletRepository::new()),
        WalletBackend::Postgres => match &pool {
            Some(pool) => Arc::new(PostgresWalletRepository::new(pool.clone())),
            None => anyhow::bail!("DATABASE_URL is required for the postgres wallet backend"),
        },
        WalletBackend::Scylla => {
            let session = db::scylla::connect(&config.scylla_node, &config.scylla_keyspace).await?;
            Arc::new(ScyllaWalletRepository::new(session))
        }
        WalletBackend::Redis => {
            let connection = db::redis::connect(&config.redis_url).await?;
            Arc::new(RedisWalletRepository::new(connection))
        }
    };

    let wallets = WalletService::new(repository).with_metrics(metrics.clone());
    run_wallet_demo(&wallets).await?;

    // === 4. Library cards with a transactional outbox ===
    let mut registry = EventRegistry::new();
    let mut bus = InProcessEventBus::new();
    register_library_events(&mut registry, &mut bus);
    let registry = Arc::new(registry);
    let bus = Arc::new(bus);

    match pool {
        Some(pool) => {
            run_library_demo(
                Arc::new(PgUnitOfWork::new(pool)),
                Arc::new(PostgresLibraryCardRepository::new()),
                Arc::new(PostgresMessageOutbox::new()),
                registry,
                bus,
                &config,
                metrics,
            )
            .await?
        }
        None => {
            let database = InMemoryDatabase::new();
            run_library_demo(
                Arc::new(InMemoryUnitOfWork::new(database.clone())),
                Arc::new(InMemoryLibraryCardRepository::new(database.clone())),
                Arc::new(InMemoryMessageOutbox::new(database)),
                registry,
                bus,
                &config,
                metrics,
            )
            .await?
        }
    }

    tracing::info!("🎉 Demo complete!");
    Ok(())
}

async fn run_wallet_demo(wallets: &WalletService) -> anyhow::Result<()> {
    tracing::info!("💰 Demonstrating wallet updates with optimistic locking");

    let wallet = wallets.open(Currency::GBP).await?;
    wallets.deposit(wallet.id(), Decimal::from(150), Currency::GBP).await?;
    wallets.withdraw(wallet.id(), Decimal::from(50), Currency::GBP).await?;
    tracing::info!(wallet_id = %wallet.id(), balance = %wallets.balance(wallet.id()).await?, "✅ Wallet updated");

    match wallets.withdraw(wallet.id(), Decimal::from(500), Currency::GBP).await {
        Ok(_) => tracing::warn!(wallet_id = %wallet.id(), "Over-withdrawal unexpectedly accepted"),
        Err(e) => tracing::info!(wallet_id = %wallet.id(), error = %e, "✅ Over-withdrawal rejected"),
    }

    Ok(())
}

async fn run_library_demo<U, R, O>(
    unit_of_work: Arc<U>,
    repository: Arc<R>,
    outbox: Arc<O>,
    registry: Arc<EventRegistry>,
    bus: Arc<InProcessEventBus>,
    config: &AppConfig,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()>
where
    U: UnitOfWork,
    R: LibraryCardRepository<Tx = U::Tx>,
    O: MessageOutbox<Tx = U::Tx>,
{
    tracing::info!("📚 Demonstrating library cards with the outbox pattern");

    let service = LibraryCardService::new(
        unit_of_work.clone(),
        repository,
        Arc::new(StoreAndForwardPublisher::new(outbox.clone())),
    );

    let card = service.create(EntityId::new()).await?;
    let resource_id = EntityId::new();
    let rental_id = service.borrow(card.id(), resource_id, DateRange::one_week()).await?;
    service.prolong(card.id(), rental_id, 3).await?;
    service.give_back(card.id(), resource_id).await?;

    let processor = OutboxProcessor::new(unit_of_work, outbox, registry, bus)
        .with_config(config.outbox.clone())
        .with_metrics(metrics);

    let published = processor.drain().await?;
    tracing::info!(published = published, "📬 Initial outbox drain finished");

    // Keep relaying until Ctrl+C
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::join!(processor.run(shutdown_rx), async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown requested"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
        if shutdown_tx.send(true).is_err() {
            tracing::debug!("Outbox processor already stopped");
        }
    });

    Ok(())
}
