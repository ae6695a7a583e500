//! Minimal monitor loop wiring the request cache to the proof worker.
//!
//! - A producer task emits level-update request ids, with repeats.
//! - The monitor claims each id in the cache and skips the ones already handled.
//! - New requests get an inclusion proof from the worker threads.
//!
//! The window comes from `LEVELGUARD_CACHE_TTL_SECS` (a `.env` file works too);
//! it falls back to 2 seconds when unset.

use std::error::Error;
use std::time::Duration;

use levelguard::{
    CacheConfig, ExpiringRequestCache, Hash32, Keccak256Hasher, MerkleProofWorker, NodeHasher,
    RequestId, WorkerConfigBuilder,
};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cache_config = CacheConfig::from_env().or_else(|err| {
        warn!(%err, "falling back to a 2 second window");
        CacheConfig::with_ttl_secs(2)
    })?;
    let cache = ExpiringRequestCache::new(cache_config)?;

    let mut worker = MerkleProofWorker::spawn(
        WorkerConfigBuilder::default()
            .threads(2)
            .response_timeout(Duration::from_secs(5))
            .build_validated()?,
    )?;

    // Leaf set: one leaf per tracked position.
    let leaves: Vec<Hash32> = (0u64..16)
        .map(|position| Keccak256Hasher.hash(&position.to_be_bytes()))
        .collect();

    let (req_tx, mut req_rx) = mpsc::channel::<RequestId>(16);
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(250));
        for n in [1u64, 2, 1, 3, 2, 1, 4, 1] {
            ticker.tick().await;
            if req_tx.send(RequestId::from(n)).await.is_err() {
                break;
            }
        }
    });

    while let Some(request) = req_rx.recv().await {
        if !cache.try_claim(&request) {
            info!(%request, "already handled inside the window, skipping");
            continue;
        }

        let slot = request.to_be_bytes().last().copied().unwrap_or(0) as usize % leaves.len();
        let position = leaves[slot];
        match worker.prove(leaves.clone(), position).await {
            Ok(outcome) => match outcome.proof() {
                Some(proof) => {
                    info!(%request, root = %proof.root, siblings = proof.len(), "proof ready")
                }
                None => warn!(%request, "position not in leaf set"),
            },
            Err(err) if err.requires_restart() => {
                warn!(%request, %err, "restarting proof worker");
                worker.restart()?;
                cache.remove(&request);
            }
            Err(err) => warn!(%request, %err, "proof job failed"),
        }
    }

    worker.shutdown();
    info!(entries = cache.entry_count(), "monitor loop finished");
    Ok(())
}
