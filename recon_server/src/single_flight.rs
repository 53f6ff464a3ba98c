//! A non-queueing "at most one at a time" guard for the linker cycle.
//!
//! The guard lives in memory, so it only stops overlapping cycles inside this process. It is not a distributed lock.
//! A second server instance pointed at the same store runs its own cycles; correctness across processes comes
//! entirely from the store's conditional claim on each deposit, which lets exactly one contender win. Scaling out
//! therefore only needs this guard replaced by a shared lock if duplicated work becomes a concern; it is never needed
//! to prevent double-spends.
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

/// Held while a flight is in progress. Dropping it, on any path including unwinding and cancellation, ends the flight.
#[derive(Debug)]
pub struct FlightPermit {
    running: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a permit if nothing is in flight, and `None` otherwise. Never waits.
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit { running: Arc::clone(&self.running) })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs `fut` if nothing else is in flight. Returns `None`, without polling `fut`, if the guard is taken.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let _permit = self.try_acquire()?;
        Some(fut.await)
    }
}
