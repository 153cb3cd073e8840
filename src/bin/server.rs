use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::{Json, Router, routing::get, routing::post};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use regionmap::config::{GenConfig, Params};
use regionmap::export::{self, FeatureCollection};
use regionmap::geo::{BBox, LonLat};
use regionmap::orchestrator::{GenerationResult, Generator};

#[derive(Deserialize)]
struct GenerateRequest {
    seed: Option<u64>,
    width: Option<usize>,
    height: Option<usize>,
    region_count: Option<usize>,
    smooth_passes: Option<u32>,
    grid_divisor: Option<u32>,
    relax_iterations: Option<u32>,
    coast_threshold: Option<f32>,
    bbox: Option<BBox>,
    /// River polylines as [lon, lat] pairs, each acting as a hard separator.
    rivers: Option<Vec<Vec<[f64; 2]>>>,
}

#[derive(Serialize)]
struct GenerateResponse {
    id: u64,
    refined: bool,
    width: usize,
    height: usize,
    map_url: String,
    regions: FeatureCollection,
    timings: Vec<TimingEntry>,
}

#[derive(Serialize)]
struct TimingEntry {
    name: String,
    ms: f64,
}

fn encode_png(rgba: &[u8], w: usize, h: usize) -> String {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder
        .write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)
        .expect("PNG encode failed");
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    format!("data:image/png;base64,{}", b64)
}

fn to_response(result: &GenerationResult) -> GenerateResponse {
    GenerateResponse {
        id: result.id,
        refined: result.refined,
        width: result.base_w,
        height: result.base_h,
        map_url: encode_png(&result.rgba, result.base_w, result.base_h),
        regions: export::regions_to_feature_collection(&result.regions),
        timings: result
            .timings
            .iter()
            .map(|t| TimingEntry {
                name: t.name.to_string(),
                ms: t.ms,
            })
            .collect(),
    }
}

async fn generate_handler(
    State(generator): State<Arc<Generator>>,
    Json(req): Json<GenerateRequest>,
) -> Json<GenerateResponse> {
    let defaults = Params::default();
    let cfg = GenConfig {
        seed: req.seed.unwrap_or(42),
        width: req.width.unwrap_or(1920),
        height: req.height.unwrap_or(1080),
        bbox: req.bbox.unwrap_or(BBox::NORTH_AMERICA),
        params: Params {
            region_count: req.region_count.unwrap_or(defaults.region_count),
            smooth_passes: req.smooth_passes.unwrap_or(defaults.smooth_passes),
            grid_divisor: req.grid_divisor.unwrap_or(defaults.grid_divisor),
            relax_iterations: req.relax_iterations.unwrap_or(defaults.relax_iterations),
            coast_threshold: req.coast_threshold.unwrap_or(defaults.coast_threshold),
            ..defaults
        },
        rivers: req.rivers.map(|rivers| {
            rivers
                .into_iter()
                .map(|line| line.into_iter().map(|[lon, lat]| LonLat::new(lon, lat)).collect())
                .collect()
        }),
    };

    // Replies with the preview; refinement lands on /api/latest when done.
    let preview = generator.generate(cfg).await;
    Json(to_response(&preview))
}

async fn latest_handler(
    State(generator): State<Arc<Generator>>,
) -> Json<Option<GenerateResponse>> {
    Json(generator.latest_committed().map(|r| to_response(&r)))
}

#[tokio::main]
async fn main() {
    let generator = Arc::new(Generator::new());
    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/latest", get(latest_handler))
        .fallback_service(frontend)
        .layer(CorsLayer::permissive())
        .with_state(generator);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    eprintln!("regionmap server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
