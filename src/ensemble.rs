//! Winner-takes-all race of one box's variants across the worker pool.
//!
//! Every variant becomes one task on a fixed-size rayon pool. Tasks report
//! through a bounded crossbeam channel and the caller consumes completions in
//! the order they finish, not the order they were submitted. The first
//! completion carrying at least one payload wins; empty completions are
//! skipped, and a race where every task comes back empty yields `None`.
//!
//! When two variants decode at nearly the same moment, the winner is whichever
//! completion the scheduler delivers first. Repeated runs on the same crop may
//! therefore report a different `method` (and even a different engine).
//!
//! Cancellation is cooperative. A settled [`RaceToken`] makes queued tasks
//! return without decoding and stops running tasks before their fallback
//! engine, but an engine call already in progress is never interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace};

use crate::engine::EngineChain;
use crate::error::ScanError;
use crate::models::{DecodeResult, Method};
use crate::variants::Variant;

/// Default number of decode workers
pub const DEFAULT_WORKERS: usize = 4;

/// Shared "race settled" flag
#[derive(Debug, Clone, Default)]
pub struct RaceToken(Arc<AtomicBool>);

impl RaceToken {
    /// Fresh, unsettled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the race as decided
    pub fn settle(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the race has been decided
    pub fn is_settled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Races variants through an [`EngineChain`] on a bounded worker pool
pub struct EnsembleDispatcher {
    pool: ThreadPool,
    chain: Arc<EngineChain>,
    deadline: Option<Duration>,
    cancel_losers: bool,
}

impl EnsembleDispatcher {
    /// Build the worker pool. No deadline, cancellation enabled.
    pub fn new(workers: usize, chain: EngineChain) -> Result<Self, ScanError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("barcode-decode-{i}"))
            .build()?;
        Ok(Self {
            pool,
            chain: Arc::new(chain),
            deadline: None,
            cancel_losers: true,
        })
    }

    /// Bound every race by `deadline`; `None` waits for all tasks
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Whether losing tasks are told to stop once the race is settled
    pub fn with_cancel_losers(mut self, cancel_losers: bool) -> Self {
        self.cancel_losers = cancel_losers;
        self
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Engines used by every task
    pub fn chain(&self) -> &EngineChain {
        &self.chain
    }

    /// Decode `variants` concurrently and return the first payload to arrive.
    ///
    /// Blocks until a task succeeds, every task has reported nothing, or the
    /// deadline expires. Expiry counts as "no decode".
    pub fn race_decode(&self, variants: Vec<Variant>) -> Option<DecodeResult> {
        if variants.is_empty() {
            return None;
        }

        let token = RaceToken::new();
        let (tx, rx) = crossbeam_channel::bounded::<(Method, Vec<DecodeResult>)>(variants.len());
        trace!(tasks = variants.len(), "submitting decode race");

        for variant in variants {
            let tx = tx.clone();
            let chain = Arc::clone(&self.chain);
            let task_token = if self.cancel_losers {
                token.clone()
            } else {
                RaceToken::new()
            };
            self.pool.spawn(move || {
                let method = variant.method;
                let results = chain.decode_until(&variant, &task_token);
                // The receiver is gone once the race is decided
                let _ = tx.send((method, results));
            });
        }
        drop(tx);

        let deadline = self.deadline.map(|d| Instant::now() + d);
        let mut completed = 0usize;
        let winner = loop {
            let completion = match deadline {
                Some(at) => match rx.recv_deadline(at) {
                    Ok(completion) => completion,
                    Err(RecvTimeoutError::Timeout) => {
                        debug!(completed, "decode deadline expired");
                        break None;
                    }
                    Err(RecvTimeoutError::Disconnected) => break None,
                },
                None => match rx.recv() {
                    Ok(completion) => completion,
                    Err(_) => break None,
                },
            };

            completed += 1;
            let (method, results) = completion;
            match results.into_iter().next() {
                Some(result) => {
                    debug!(
                        %method,
                        engine = %result.engine,
                        symbology = %result.symbology,
                        completed,
                        "decode race won"
                    );
                    break Some(result);
                }
                None => trace!(%method, "variant produced no payload"),
            }
        };

        token.settle();
        winner
    }
}

impl std::fmt::Debug for EnsembleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleDispatcher")
            .field("workers", &self.workers())
            .field("chain", &self.chain)
            .field("deadline", &self.deadline)
            .field("cancel_losers", &self.cancel_losers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DecodeEngine, Symbol};
    use crate::error::EngineError;
    use crate::models::EngineRole;
    use image::GrayImage;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    /// Decodes only the listed methods, after an optional per-method delay.
    ///
    /// Variants are tagged by painting the method index into pixel (0, 0).
    struct Scripted {
        hits: Vec<Method>,
        delay: fn(Method) -> Duration,
        calls: Arc<AtomicUsize>,
    }

    impl DecodeEngine for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn decode(&self, image: &GrayImage) -> Result<Vec<Symbol>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let method = Method::ALL[image.get_pixel(0, 0)[0] as usize];
            thread::sleep((self.delay)(method));
            if self.hits.contains(&method) {
                Ok(vec![Symbol::new(method.as_str(), "TEST")])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn variants() -> Vec<Variant> {
        Method::ALL
            .iter()
            .enumerate()
            .map(|(i, &m)| Variant::new(GrayImage::from_pixel(4, 4, image::Luma([i as u8])), m))
            .collect()
    }

    fn dispatcher(workers: usize, engine: Scripted) -> EnsembleDispatcher {
        EnsembleDispatcher::new(workers, EngineChain::new(Box::new(engine), None)).unwrap()
    }

    fn no_delay(_: Method) -> Duration {
        Duration::ZERO
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn test_single_successful_variant_wins() {
        let d = dispatcher(
            4,
            Scripted {
                hits: vec![Method::SharpenUpscale],
                delay: no_delay,
                calls: counter(),
            },
        );
        let result = d.race_decode(variants()).unwrap();
        assert_eq!(result.method, Method::SharpenUpscale);
        assert_eq!(result.engine, EngineRole::Fast);
        assert_eq!(result.data, "Sharpen_Upscale");
    }

    #[test]
    fn test_all_empty_returns_none() {
        let d = dispatcher(
            2,
            Scripted {
                hits: Vec::new(),
                delay: no_delay,
                calls: counter(),
            },
        );
        assert!(d.race_decode(variants()).is_none());
        assert!(d.race_decode(Vec::new()).is_none());
    }

    #[test]
    fn test_fastest_success_beats_slow_success() {
        fn slow_original(m: Method) -> Duration {
            if m == Method::Original {
                Duration::from_millis(300)
            } else {
                Duration::ZERO
            }
        }
        let d = dispatcher(
            4,
            Scripted {
                hits: vec![Method::Original, Method::OtsuErosion],
                delay: slow_original,
                calls: counter(),
            },
        );
        assert_eq!(d.race_decode(variants()).unwrap().method, Method::OtsuErosion);
    }

    #[test]
    fn test_deadline_bounds_the_race() {
        fn slow(_: Method) -> Duration {
            Duration::from_millis(400)
        }
        let d = dispatcher(
            4,
            Scripted {
                hits: Method::ALL.to_vec(),
                delay: slow,
                calls: counter(),
            },
        )
        .with_deadline(Some(Duration::from_millis(50)));
        let started = Instant::now();
        assert!(d.race_decode(variants()).is_none());
        assert!(started.elapsed() < Duration::from_millis(350));
    }

    #[test]
    fn test_settled_race_skips_queued_tasks() {
        fn tick(_: Method) -> Duration {
            Duration::from_millis(30)
        }
        let calls = counter();
        let d = dispatcher(
            1,
            Scripted {
                hits: Method::ALL.to_vec(),
                delay: tick,
                calls: calls.clone(),
            },
        );
        assert!(d.race_decode(variants()).is_some());
        thread::sleep(Duration::from_millis(200));
        // The task picked up while the winner was being reported may still run
        assert!(calls.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_losers_run_to_completion_without_cancellation() {
        fn tick(_: Method) -> Duration {
            Duration::from_millis(10)
        }
        let calls = counter();
        let d = dispatcher(
            1,
            Scripted {
                hits: Method::ALL.to_vec(),
                delay: tick,
                calls: calls.clone(),
            },
        )
        .with_cancel_losers(false);
        assert!(d.race_decode(variants()).is_some());
        let waited = Instant::now();
        while calls.load(Ordering::SeqCst) < 4 && waited.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_pool_size() {
        let d = dispatcher(
            3,
            Scripted {
                hits: Vec::new(),
                delay: no_delay,
                calls: counter(),
            },
        );
        assert_eq!(d.workers(), 3);
    }

    #[test]
    fn test_race_token() {
        let token = RaceToken::new();
        let shared = token.clone();
        assert!(!shared.is_settled());
        token.settle();
        assert!(shared.is_settled());
    }
}
