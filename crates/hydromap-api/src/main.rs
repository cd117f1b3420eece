use std::sync::Arc;

use anyhow::Context;
use hydromap_core::config::HydroConfig;
use hydromap_core::models::RasterLayer;
use hydromap_core::ports::{FileRasterSource, RasterSource};
use hydromap_store::connect_result_cache;
use hydromap_watershed::Delineator;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hydromap_api::{cors_layer, create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydromap_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_config = ApiConfig::from_env();
    let config = HydroConfig::load().context("Failed to load configuration")?;

    tracing::info!(
        dem = %config.dem_path.value.display(),
        cache_enabled = config.cache_enabled.value,
        cache_backend = %config.cache_backend.value,
        "Starting Hydromap API server"
    );

    let rasters: Arc<dyn RasterSource> = Arc::new(FileRasterSource::from_config(&config));
    for layer in RasterLayer::ALL {
        if !rasters.exists(layer) {
            tracing::warn!(
                layer = %layer,
                path = %rasters.location(layer).display(),
                "Raster not found; delineation will be unavailable until it exists"
            );
        }
    }

    let cache = connect_result_cache(&config).await.context("Failed to initialise result cache")?;
    let delineator = Delineator::from_config(&config, rasters, cache);
    let state = Arc::new(AppState::new(delineator));

    let app = create_router(state)
        .layer(cors_layer(&api_config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let addr = api_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!(origins = ?api_config.cors_origins, "CORS enabled");

    axum::serve(listener, app).await.context("Server error")?;

    tracing::info!("Shutting down Hydromap API server");
    Ok(())
}
