use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::GenConfig;
use crate::geo::BBox;
use crate::grid::Grid;
use crate::render;
use crate::terrain::TerrainCache;
use crate::worker::PartitionWorker;
use crate::{run_pass, Region, Timing};

/// A committed generation: everything a client needs to draw one frame and
/// hit-test it.
pub struct GenerationResult {
    pub id: u64,
    pub regions: Vec<Region>,
    pub assignments: Grid<i32>,
    pub grid_w: usize,
    pub grid_h: usize,
    pub base_w: usize,
    pub base_h: usize,
    pub bbox: BBox,
    /// Composited frame, RGBA, base_w x base_h.
    pub rgba: Vec<u8>,
    pub timings: Vec<Timing>,
    /// False for the fast preview pass, true once refined.
    pub refined: bool,
}

impl GenerationResult {
    /// Region under a base-resolution pixel, None over water or out of frame.
    pub fn region_at(&self, px: usize, py: usize) -> Option<&Region> {
        if px >= self.base_w || py >= self.base_h {
            return None;
        }
        let gx = px * self.grid_w / self.base_w;
        let gy = py * self.grid_h / self.base_h;
        let id = self.assignments.get(gx, gy);
        if id < 0 {
            return None;
        }
        self.regions.iter().find(|r| r.id == id as usize)
    }
}

/// Drives the two-pass generation flow. Each request gets a fresh id; a
/// newer request silently invalidates every older in-flight refinement, so
/// at most one result per id ever lands and the committed result only moves
/// forward.
pub struct Generator {
    latest: AtomicU64,
    committed: Mutex<Option<Arc<GenerationResult>>>,
    cache: TerrainCache,
    worker: Option<PartitionWorker>,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
            committed: Mutex::new(None),
            cache: TerrainCache::new(),
            worker: Some(PartitionWorker::spawn()),
        }
    }

    /// In-thread partitioning only. Used by tests and single-shot CLI runs.
    pub fn without_worker() -> Self {
        Self {
            latest: AtomicU64::new(0),
            committed: Mutex::new(None),
            cache: TerrainCache::new(),
            worker: None,
        }
    }

    pub fn latest_committed(&self) -> Option<Arc<GenerationResult>> {
        self.committed.lock().unwrap().clone()
    }

    fn is_current(&self, id: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == id
    }

    /// Commit under the lock, re-checking currency so a stale refinement
    /// never clobbers a newer generation.
    pub(crate) fn commit(&self, result: Arc<GenerationResult>) -> bool {
        let mut slot = self.committed.lock().unwrap();
        if !self.is_current(result.id) {
            return false;
        }
        *slot = Some(result);
        true
    }

    /// Run the preview pass, commit it, and kick off background refinement.
    /// Returns the preview whether or not it was still current at commit.
    pub async fn generate(self: Arc<Self>, cfg: GenConfig) -> Arc<GenerationResult> {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        // Preview: half resolution, coarser grid. Same seed streams, so the
        // refined map keeps roughly the same shape the preview sketched.
        let pw = (cfg.width / 2).max(2);
        let ph = (cfg.height / 2).max(2);
        let divisor = cfg.params.grid_divisor.saturating_mul(2);
        let terrain = self
            .cache
            .get_or_render(cfg.seed, pw, ph, &cfg.bbox, &cfg.params);
        let preview = self.run_one(&cfg, id, pw, ph, divisor, false, terrain).await;
        self.commit(preview.clone());

        let this = self.clone();
        tokio::spawn(async move {
            this.refine(cfg, id).await;
        });

        preview
    }

    /// Full-resolution second pass. Bails out whenever a newer generation
    /// has started: before the terrain render, between terrain and the
    /// partition pipeline, and again at commit time.
    pub(crate) async fn refine(self: Arc<Self>, cfg: GenConfig, id: u64) {
        if !self.is_current(id) {
            return;
        }
        let terrain = self
            .cache
            .get_or_render(cfg.seed, cfg.width, cfg.height, &cfg.bbox, &cfg.params);
        if !self.is_current(id) {
            return;
        }
        let result = self
            .run_one(&cfg, id, cfg.width, cfg.height, cfg.params.grid_divisor, true, terrain)
            .await;
        self.commit(result);
    }

    async fn run_one(
        &self,
        cfg: &GenConfig,
        id: u64,
        base_w: usize,
        base_h: usize,
        divisor: u32,
        refined: bool,
        terrain: Arc<crate::terrain::TerrainRaster>,
    ) -> Arc<GenerationResult> {
        let pass = run_pass(cfg, base_w, base_h, divisor, &terrain, self.worker.as_ref()).await;
        let rgba = render::render_regions(
            &terrain,
            &pass,
            cfg.params.region_count,
            &cfg.bbox,
            cfg.seed,
        );
        Arc::new(GenerationResult {
            id,
            regions: pass.regions,
            assignments: pass.assignments,
            grid_w: pass.grid_w,
            grid_h: pass.grid_h,
            base_w,
            base_h,
            bbox: cfg.bbox,
            rgba,
            timings: pass.timings,
            refined,
        })
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}
