use arritranco_backend::{
    config::Config,
    database::Database,
    docs::ApiDoc,
    error::AppResult,
    handlers::AppState,
    repositories::{AssetRepository, PgAssetRepository, PgTaskStatusStore, TaskStatusStore},
    routes::create_api_routes,
    services::{ConfigRenderer, NscaRelayFactory, StatusSyncer},
};
use axum::{Router, response::Json, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> AppResult<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arritranco_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = match Config::from_file(CONFIG_PATH) {
        Ok(config) => {
            tracing::info!("已加载配置文件: {}", CONFIG_PATH);
            config
        }
        // 配置文件存在但无效时不覆盖
        Err(e) if std::path::Path::new(CONFIG_PATH).exists() => return Err(e),
        Err(_) => {
            tracing::warn!("未找到配置文件，使用默认配置");
            let default_config = Config::default();
            // 保存默认配置到文件
            if let Err(e) = default_config.save_to_file(CONFIG_PATH) {
                tracing::warn!("保存默认配置失败: {}", e);
            }
            default_config
        }
    };
    config.validate()?;

    tracing::info!("服务器配置: {}", config.server_addr());
    tracing::info!("NSCA服务端: {}", config.nsca.addr());

    // 资产库是配置生成的唯一数据来源，连接失败直接退出
    let database = Database::new(&config.database).await?;
    let assets: Arc<dyn AssetRepository> = Arc::new(PgAssetRepository::new(database.pool().clone()));
    let task_statuses: Arc<dyn TaskStatusStore> =
        Arc::new(PgTaskStatusStore::new(database.pool().clone()));

    let renderer = Arc::new(ConfigRenderer::new(assets.clone())?);
    let syncer = Arc::new(StatusSyncer::new(
        assets,
        task_statuses.clone(),
        Arc::new(NscaRelayFactory::new(config.nsca.clone())),
    ));

    if config.sync.enabled {
        let sync_config = config.sync.clone();
        tracing::info!(
            "启动备份状态同步循环，间隔: {}秒，单次超时: {}秒",
            sync_config.interval_secs,
            sync_config.run_timeout_secs
        );
        let loop_syncer = syncer.clone();
        tokio::spawn(async move {
            loop_syncer.start_sync_loop(sync_config).await;
        });
    } else {
        tracing::info!("定时同步已关闭，仅响应 /nagios/refresh-status 请求");
    }

    // 创建应用状态
    let app_state = AppState {
        database: Some(database),
        renderer,
        syncer,
        task_statuses,
    };

    let app = Router::new()
        // OpenAPI JSON 路由
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(create_api_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(&config.server_addr()).await?;
    tracing::info!("服务器启动成功，监听地址: {}", config.server_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
