use price_loader::{
    api,
    codec::CoercionPolicy,
    config::StorageBackend,
    create_pool, AppConfig, ExportService, IngestService, MemoryPriceStore, PgPriceStore,
    PriceStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    match config.database.backend {
        StorageBackend::Postgres => {
            // 创建数据库连接池
            let pool = create_pool(&config.database.url, config.database.max_connections).await?;
            info!("Database pool created");

            serve(PgPriceStore::new(pool.clone()), &config).await?;
            pool.close().await;
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            serve(MemoryPriceStore::new(), &config).await?;
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn serve<S: PriceStore>(
    store: S,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let policy = if config.ingest.reject_invalid_numbers {
        CoercionPolicy::Reject
    } else {
        CoercionPolicy::ZeroFill
    };

    let state = api::PricesState {
        ingest: Arc::new(
            IngestService::new(store.clone(), policy)
                .with_max_csv_bytes(config.ingest.max_csv_bytes),
        ),
        export: Arc::new(ExportService::new(store).with_header(config.export.include_header)),
    };

    let app = api::router(state, config.ingest.max_upload_bytes);

    // 启动服务器
    let addr = config.listen_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST {}  - upload zip, returns batch summary", api::PRICES_PATH);
    info!("  GET  {}  - download all prices as zip", api::PRICES_PATH);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
