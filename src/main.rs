use dotenvy::dotenv;
use std::time::Duration;
use storefront_sync::config::{database, store};
use storefront_sync::core::admin::AdminStore;
use storefront_sync::core::storefront::Storefront;
use storefront_sync::core::sync::{Broadcaster, StorefrontHandle, window_bus};
use storefront_sync::errors::Result;
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const INITIAL_SYNC_DELAY: Duration = Duration::from_secs(1);
const STOREFRONT_INBOX_SIZE: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load store configuration
    let config = store::load_default_config()
        .inspect_err(|e| error!("Failed to load store configuration: {}", e))?;
    let policy = config.sync.transition_policy;
    info!("Order status transitions are {:?}", policy);

    // 4. Open the shared key/value store
    if std::env::var("DATABASE_URL").is_err() {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to storage: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Start the storefront and its sync receiver
    let storefront = Storefront::open(db.clone(), policy).await?;
    let (handle, inbox) = StorefrontHandle::channel(STOREFRONT_INBOX_SIZE);
    let (storefront_bus, storefront_messages) = window_bus();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let receiver = tokio::spawn(storefront.run(
        Some(inbox),
        Some(storefront_messages),
        config.sync.poll_interval(),
        shutdown_rx,
    ));

    // 6. Open the admin as a window opened from the storefront
    let (admin_bus, _admin_messages) = window_bus();
    let broadcaster = Broadcaster::new()
        .with_opener(handle)
        .with_parent(storefront_bus)
        .with_window(admin_bus);
    let mut admin = AdminStore::open(db.clone(), config.seed_catalog(), broadcaster, policy).await?;

    tokio::time::sleep(INITIAL_SYNC_DELAY).await;
    let report = admin.force_sync().await?;
    info!(
        "Initial sync completed ({} of {} paths delivered)",
        report.delivered_count(),
        report.outcomes.len()
    );

    let summary = admin.dashboard().await?;
    info!(
        "Dashboard: {} products, {} orders ({} pending)",
        summary.total_products, summary.total_orders, summary.pending_orders
    );

    // 7. Run until Ctrl-C
    info!("Storefront running. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    if shutdown_tx.send(true).is_err() {
        debug!("Storefront receiver already stopped");
    }

    match receiver.await {
        Ok(storefront) => info!(
            "Stopped with {} products in catalog and {} items in cart",
            storefront.products().await.len(),
            storefront.cart().item_count()
        ),
        Err(e) => error!("Storefront receiver task failed: {}", e),
    }

    Ok(())
}
