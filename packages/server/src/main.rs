use std::sync::Arc;

use anyhow::Context;
use common::storage::FilesystemBlobStore;
use tracing::info;

use school_server::config::AppConfig;
use school_server::database::init_db;
use school_server::repository::SeaOrmRepository;
use school_server::services::avatar::AvatarService;
use school_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log.max_level())
        .init();

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected and schema synced");

    let blob_store = FilesystemBlobStore::new(
        config.avatar.dir.clone(),
        config.avatar.max_upload_size,
    )
    .await
    .context("Failed to initialize avatar storage")?;
    info!(dir = %config.avatar.dir.display(), "Avatar storage ready");

    let repository = Arc::new(SeaOrmRepository::new(db.clone()));
    let avatars = Arc::new(AvatarService::new(
        Arc::new(blob_store),
        repository.clone(),
        repository,
        &config.avatar,
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        avatars,
    };
    let app = school_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    info!("API docs available at http://{}/scalar", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
