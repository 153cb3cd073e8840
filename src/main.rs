use std::path::PathBuf;

use regionmap::config::GenConfig;
use regionmap::{export, render, run_pass, terrain};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let width: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1920);
    let height: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1080);
    let out_dir: PathBuf = args
        .get(4)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    std::fs::create_dir_all(&out_dir).expect("failed to create output directory");

    let cfg = GenConfig {
        seed,
        width,
        height,
        ..GenConfig::default()
    };

    eprintln!(
        "Generating {}x{} region map with seed={}, regions={}, divisor={}",
        width, height, seed, cfg.params.region_count, cfg.params.grid_divisor
    );

    let raster = terrain::render_terrain(
        seed,
        width,
        height,
        &cfg.bbox,
        &cfg.params.noise,
        cfg.params.coast_threshold,
    );
    let pass = run_pass(&cfg, width, height, cfg.params.grid_divisor, &raster, None).await;

    eprintln!("\nTimings:");
    for t in &pass.timings {
        eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
    }

    eprintln!("\nRegions ({}):", pass.regions.len());
    for r in &pass.regions {
        eprintln!(
            "  [{:2}] {:28} {:5} cells, {} loops",
            r.id,
            r.name,
            r.cell_count,
            r.polygons.len()
        );
    }

    let save = |name: &str, rgba: &[u8], w: usize, h: usize| {
        let path = out_dir.join(name);
        image::save_buffer(&path, rgba, w as u32, h as u32, image::ColorType::Rgba8)
            .expect("failed to save image");
        eprintln!("Saved {}", path.display());
    };

    // 1. Base terrain
    save("terrain.png", &raster.rgba, width, height);

    // 2. Raw assignment grid
    let assign_rgba = render::render_assignments(&pass.assignments);
    save("assignments.png", &assign_rgba, pass.grid_w, pass.grid_h);

    // 3. Composited political map
    let map_rgba = render::render_regions(&raster, &pass, cfg.params.region_count, &cfg.bbox, seed);
    save("map.png", &map_rgba, width, height);

    // 4. GeoJSON export
    let fc = export::regions_to_feature_collection(&pass.regions);
    let geojson_path = out_dir.join("regions.geojson");
    let json = serde_json::to_string_pretty(&fc).expect("GeoJSON encode failed");
    std::fs::write(&geojson_path, json).expect("failed to write GeoJSON");
    eprintln!("Saved {}", geojson_path.display());

    eprintln!("\nDone.");
}
