use std::sync::Arc;

use sketchroom::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), SketchroomError> {
    let config = ServerConfig::from_env()?;

    let words = match &config.words_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "loading word lists");
            let source = StaticWordSource::from_dir(dir).map_err(SketchroomError::Words)?;
            tracing::info!(categories = ?source.categories(), "word lists loaded");
            source
        }
        None => StaticWordSource::builtin(),
    };

    let server = SketchroomServer::builder()
        .bind(&config.bind_addr())
        .room_config(config.room.clone())
        .idle_timeout(config.idle_timeout)
        .build(Arc::new(MemoryStore::new()), Arc::new(words))
        .await?;
    server.run().await
}
