use tracing_subscriber::EnvFilter;

use cardbookd::config::Config;
use cardbookd::http::{self, AppState};
use cardbookd::db;
use cardbookd::media::MediaStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cardbookd=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let conn = db::open_db(&config.workspace)?;
    let media = MediaStore::new(config.workspace.join("media"));
    std::fs::create_dir_all(media.root())?;

    let state = AppState::new(conn, media);
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!(addr = %config.listen, workspace = %config.workspace.display(), "cardbookd listening");
    axum::serve(listener, app).await?;
    Ok(())
}
