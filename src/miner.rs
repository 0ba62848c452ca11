//! Worker loop driving a [`MiningPool`]: request work, mine it, submit it.

use crate::error::ChainError;
use crate::pool::MiningPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one get-work / mine / commit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted { height: usize, nonce: u64 },
    /// Another block was appended first; the work is lost.
    Stale,
    /// No solution in the assigned range.
    Exhausted,
    Cancelled,
    Rejected(ChainError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub miner_id: u64,
    pub attempts: u64,
    pub accepted: Vec<usize>,
    pub stale: u64,
    pub exhausted: u64,
    pub rejected: u64,
    /// The error that ended the loop early, if any.
    pub last_error: Option<ChainError>,
}

pub struct Worker {
    id: u64,
    pool: Arc<MiningPool>,
}

impl Worker {
    pub fn new(id: u64, pool: Arc<MiningPool>) -> Self {
        Self { id, pool }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn attempt(&self, cancel: &AtomicBool) -> Outcome {
        let mut work = match self.pool.get_work(self.id) {
            Ok(work) => work,
            Err(e) => return Outcome::Rejected(e),
        };

        match work.mine_until(cancel) {
            Ok(()) => {}
            Err(ChainError::Exhausted { start, end }) => {
                debug!("Miner {} found nothing in {}..{}", self.id, start, end);
                return Outcome::Exhausted;
            }
            Err(ChainError::Cancelled) => return Outcome::Cancelled,
            Err(e) => return Outcome::Rejected(e),
        }

        let nonce = work.template.nonce.unwrap_or_default();
        match self.pool.commit_work(work.template) {
            Ok(height) => Outcome::Accepted { height, nonce },
            Err(ChainError::LinkMismatch { .. }) => Outcome::Stale,
            Err(e) => Outcome::Rejected(e),
        }
    }

    /// Keep requesting work until the chain holds `target_len` blocks or
    /// `cancel` is set. A rejection that is not about the race (for example
    /// a used-up nonce space) ends the loop.
    pub fn run(&self, target_len: usize, cancel: &AtomicBool) -> WorkerReport {
        let mut report = WorkerReport {
            miner_id: self.id,
            ..WorkerReport::default()
        };

        while !cancel.load(Ordering::Relaxed) && self.pool.len() < target_len {
            report.attempts += 1;
            match self.attempt(cancel) {
                Outcome::Accepted { height, .. } => report.accepted.push(height),
                Outcome::Stale => report.stale += 1,
                Outcome::Exhausted => report.exhausted += 1,
                Outcome::Cancelled => break,
                Outcome::Rejected(e) => {
                    warn!("Miner {} stopped: {}", self.id, e);
                    report.rejected += 1;
                    report.last_error = Some(e);
                    break;
                }
            }
        }

        report
    }
}

/// Everything a finished [`race`] produced.
#[derive(Debug, Clone, Default)]
pub struct RaceReport {
    pub target_len: usize,
    pub workers: Vec<WorkerReport>,
    /// Ids of workers whose thread panicked and left no report.
    pub panicked: Vec<u64>,
}

impl RaceReport {
    /// Succeeds only if every worker returned, the chain reached the target
    /// length and the whole chain still validates.
    pub fn check(&self, pool: &MiningPool) -> Result<(), ChainError> {
        if let Some(id) = self.panicked.first() {
            return Err(ChainError::WorkerPanicked(*id));
        }

        let reached = pool.len();
        if reached < self.target_len {
            return Err(ChainError::TargetNotReached {
                reached,
                target: self.target_len,
            });
        }

        pool.validate()
    }
}

/// Run `workers` miners on their own threads until the chain holds
/// `target_len` blocks or every worker has given up.
///
/// Workers still searching are cancelled only once the target is reached; a
/// worker that stops for any other reason leaves the rest running.
pub fn race(pool: &Arc<MiningPool>, workers: u64, target_len: usize) -> RaceReport {
    let cancel = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let worker = Worker::new(id, pool.clone());
                let cancel = &cancel;
                let handle = scope.spawn(move || {
                    let report = worker.run(target_len, cancel);
                    if worker.pool.len() >= target_len {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    debug!(
                        "Miner {} finished after {} attempts",
                        worker.id(),
                        report.attempts
                    );
                    report
                });
                (id, handle)
            })
            .collect();

        let mut race = RaceReport {
            target_len,
            ..RaceReport::default()
        };
        for (id, handle) in handles {
            match handle.join() {
                Ok(report) => race.workers.push(report),
                Err(_) => {
                    warn!("Miner {} panicked", id);
                    race.panicked.push(id);
                }
            }
        }
        race
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Chain;

    #[test]
    fn test_single_worker_extends_chain() {
        let chain = Chain::new("Genesis", 8).unwrap();
        let pool = Arc::new(MiningPool::new(chain, 1 << 16).unwrap());
        let worker = Worker::new(3, pool.clone());
        let cancel = AtomicBool::new(false);

        let report = worker.run(4, &cancel);
        assert_eq!(pool.len(), 4);
        assert_eq!(report.accepted, vec![1, 2, 3]);
        assert_eq!(report.stale, 0);
        assert!(pool.validate().is_ok());
    }

    #[test]
    fn test_cancelled_worker_does_nothing() {
        let chain = Chain::new("Genesis", 8).unwrap();
        let pool = Arc::new(MiningPool::new(chain, 1 << 16).unwrap());
        let worker = Worker::new(0, pool.clone());
        let cancel = AtomicBool::new(true);

        assert_eq!(worker.attempt(&cancel), Outcome::Cancelled);
        assert_eq!(worker.run(10, &cancel).attempts, 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_tiny_ranges_mostly_exhaust() {
        // 4 nonces against difficulty 12: a hit has odds of about 1 in 1000.
        let chain = Chain::new("Genesis", 12).unwrap();
        let pool = Arc::new(MiningPool::new(chain, 4).unwrap());
        let worker = Worker::new(0, pool.clone());
        let cancel = AtomicBool::new(false);

        let outcomes: Vec<Outcome> = (0..50).map(|_| worker.attempt(&cancel)).collect();
        let exhausted = outcomes.iter().filter(|o| **o == Outcome::Exhausted).count();
        assert!(exhausted >= 40, "only {} of 50 ranges exhausted", exhausted);
        assert_eq!(pool.stats().ranges_issued, 50);
    }

    #[test]
    fn test_worker_keeps_the_error_that_stopped_it() {
        let chain = Chain::new("Genesis", 8).unwrap();
        let pool = Arc::new(MiningPool::new(chain, u64::MAX).unwrap());
        let worker = Worker::new(5, pool.clone());
        let cancel = AtomicBool::new(false);

        let report = worker.run(10, &cancel);
        assert_eq!(worker.id(), 5);
        assert_eq!(report.accepted, vec![1]);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.last_error, Some(ChainError::NonceSpaceExhausted));
        assert_eq!(pool.stats().rejected, 1);
        assert!(!cancel.load(Ordering::Relaxed));
    }

    #[test]
    fn test_race_short_of_target_is_an_error() {
        // The first range covers the whole nonce space, so after one block
        // every request for work fails.
        let chain = Chain::new("Genesis", 8).unwrap();
        let pool = Arc::new(MiningPool::new(chain, u64::MAX).unwrap());

        let race = race(&pool, 2, 4);
        assert_eq!(race.workers.len(), 2);
        assert!(race.panicked.is_empty());
        assert_eq!(pool.len(), 2);

        let accepted: usize = race.workers.iter().map(|r| r.accepted.len()).sum();
        assert_eq!(accepted, 1);
        assert!(race
            .workers
            .iter()
            .all(|r| r.last_error == Some(ChainError::NonceSpaceExhausted)));
        assert_eq!(pool.stats().rejected, 2);

        assert_eq!(
            race.check(&pool),
            Err(ChainError::TargetNotReached {
                reached: 2,
                target: 4
            })
        );
    }

    #[test]
    fn test_race_reaching_target_passes_check() {
        let chain = Chain::new("Genesis", 8).unwrap();
        let pool = Arc::new(MiningPool::new(chain, 1 << 16).unwrap());

        let race = race(&pool, 3, 4);
        assert!(pool.len() >= 4);
        assert!(race.workers.iter().all(|r| r.last_error.is_none()));
        assert_eq!(race.check(&pool), Ok(()));
    }

    #[test]
    fn test_panicked_worker_fails_check() {
        let chain = Chain::new("Genesis", 8).unwrap();
        let pool = MiningPool::new(chain, 1 << 16).unwrap();
        let race = RaceReport {
            target_len: 1,
            workers: Vec::new(),
            panicked: vec![2],
        };
        assert_eq!(race.check(&pool), Err(ChainError::WorkerPanicked(2)));
    }
}
