use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use tokio::sync::oneshot;

use crate::regions::partition::{PartitionJob, PartitionOutcome, lloyd_relax_blocking};

struct Request {
    id: u64,
    job: PartitionJob,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<PartitionOutcome>>>>;

/// Offloads the assignment + relaxation step to a dedicated thread via
/// one-shot request/response messages. Requests carry a locally
/// incrementing correlation id and are resolved exactly once through the
/// pending map; any channel failure surfaces as `None` so callers fall
/// back to the in-thread cooperative path.
pub struct PartitionWorker {
    tx: mpsc::Sender<Request>,
    pending: Pending,
    next_id: AtomicU64,
}

impl PartitionWorker {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Request>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let thread_pending = pending.clone();
        thread::Builder::new()
            .name("partition-worker".into())
            .spawn(move || {
                for req in rx {
                    let outcome = lloyd_relax_blocking(&req.job);
                    let sender = thread_pending.lock().unwrap().remove(&req.id);
                    if let Some(sender) = sender {
                        // Receiver may be gone if the generation went stale.
                        let _ = sender.send(outcome);
                    }
                }
            })
            .expect("failed to spawn partition worker thread");
        Self {
            tx,
            pending,
            next_id: AtomicU64::new(0),
        }
    }

    /// Submit a job and await its response. `None` means the worker is
    /// unavailable or failed; the caller computes synchronously instead.
    pub async fn compute(&self, job: PartitionJob) -> Option<PartitionOutcome> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, reply_tx);
        if self.tx.send(Request { id, job }).is_err() {
            self.pending.lock().unwrap().remove(&id);
            return None;
        }
        reply_rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OCEAN_COLOR, OCEAN_DIST};
    use crate::geo::{BBox, LonLat};

    fn small_job() -> PartitionJob {
        let (gw, gh) = (40, 24);
        let mut pixels = vec![0u8; gw * gh * 4];
        for i in 0..gw * gh {
            pixels[i * 4..i * 4 + 4].copy_from_slice(&[170, 170, 170, 255]);
        }
        PartitionJob {
            grid_w: gw,
            grid_h: gh,
            pixels,
            seeds: vec![
                LonLat::new(-130.0, 55.0),
                LonLat::new(-90.0, 30.0),
                LonLat::new(-70.0, 45.0),
            ],
            river_mask: None,
            iterations: 2,
            bbox: BBox::NORTH_AMERICA,
            ocean_color: OCEAN_COLOR,
            ocean_dist: OCEAN_DIST,
            relax_seed: 11,
        }
    }

    #[tokio::test]
    async fn worker_matches_blocking_fallback() {
        let worker = PartitionWorker::spawn();
        let job = small_job();
        let via_worker = worker.compute(job.clone()).await.expect("worker reply");
        let direct = lloyd_relax_blocking(&job);
        assert_eq!(via_worker.assignments, direct.assignments);
        assert_eq!(via_worker.seeds, direct.seeds);
    }

    #[tokio::test]
    async fn worker_handles_sequential_requests() {
        let worker = PartitionWorker::spawn();
        let a = worker.compute(small_job()).await;
        let b = worker.compute(small_job()).await;
        assert!(a.is_some() && b.is_some());
        assert_eq!(a.unwrap().assignments, b.unwrap().assignments);
    }
}
