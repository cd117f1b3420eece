//! Router behaviour over an in-memory raster source

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use hydromap_api::{create_router, AppState};
use hydromap_core::models::{GeoTransform, Raster, RasterLayer};
use hydromap_core::ports::{MemoryRasterSource, RasterSource};
use hydromap_store::{MemoryResultCache, ResultCache};
use hydromap_watershed::Delineator;
use serde_json::{json, Value};
use tower::ServiceExt;

fn cross_source() -> MemoryRasterSource {
    let fdir = Raster::from_rows(vec![
        vec![0.0, 4.0, 0.0],
        vec![1.0, 0.0, 16.0],
        vec![0.0, 64.0, 0.0],
    ])
    .unwrap()
    .with_transform(GeoTransform::new(-77.0, 39.0, 0.001, -0.001))
    .with_nodata(0.0);
    MemoryRasterSource::new().with_layer(RasterLayer::FlowDirection, fdir)
}

fn app(source: MemoryRasterSource) -> Router {
    let rasters: Arc<dyn RasterSource> = Arc::new(source);
    let cache: Arc<dyn ResultCache> = Arc::new(MemoryResultCache::new());
    let delineator = Delineator::new(rasters, Some(cache)).with_snap_defaults(false, 100);
    create_router(Arc::new(AppState::new(delineator)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn test_health_and_root() {
    let app = app(cross_source());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["delineate"], "/api/delineate");
}

#[tokio::test]
async fn test_delineate_then_cache_hit() {
    let app = app(cross_source());
    let body = json!({ "lat": 38.9985, "lon": -76.9985 });

    let (status, first) = send(&app, Method::POST, "/api/delineate", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["statistics"]["num_cells"], 5);
    assert_eq!(first["watershed"]["geometry"]["type"], "Polygon");
    assert_eq!(first["metadata"]["from_cache"], false);
    assert!(first["metadata"]["snap_radius"].is_null());

    let (status, second) = send(&app, Method::POST, "/api/delineate", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["metadata"]["from_cache"], true);
    assert_eq!(second["watershed"], first["watershed"]);
    assert_eq!(second["statistics"], first["statistics"]);
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let app = app(cross_source());

    let (status, body) = send(&app, Method::POST, "/api/delineate", Some(json!({ "lat": 91.0, "lon": 0.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lat"));

    let request = json!({ "lat": 38.9985, "lon": -76.9985, "snap_to_stream": true, "snap_radius": 1001 });
    let (status, _) = send(&app, Method::POST, "/api/delineate", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Inside the valid coordinate range but off the raster
    let (status, _) = send(&app, Method::POST, "/api/delineate", Some(json!({ "lat": 10.0, "lon": 10.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_rasters_are_503() {
    let app = app(MemoryRasterSource::new());
    let (status, body) = send(&app, Method::POST, "/api/delineate", Some(json!({ "lat": 38.9985, "lon": -76.9985 }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().starts_with("Required data files not found"));
}

#[tokio::test]
async fn test_status_report() {
    let app = app(cross_source());
    let (status, body) = send(&app, Method::GET, "/api/delineate/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], false);
    assert_eq!(body["cache_enabled"], true);
    assert_eq!(body["files"]["flow_direction"]["exists"], true);
    assert_eq!(body["files"]["dem"]["exists"], false);
    assert_eq!(body["files"]["dem"]["path"], "memory://dem");
}
