//! Concurrent pass helpers.
//!
//! Runs the same pass from several threads at once so tests can check that
//! racing writers converge on one row per remote record.

use crate::fixtures::Scenario;
use recsync_core::{Mapping, PassReport, SyncResult};
use std::sync::{Arc, Barrier};
use std::thread;

/// Runs the initializer for `mapping` from `threads` threads at once.
///
/// Returns the result of every thread, in spawn order.
pub fn concurrent_initialize(
    scenario: &Scenario,
    mapping: &Arc<Mapping>,
    threads: usize,
) -> Vec<SyncResult<PassReport>> {
    let barrier = &Barrier::new(threads);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    scenario.initializer(mapping).run()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("Initializer thread panicked"))
            .collect()
    })
}

/// Runs the cleaner for `mapping` from `threads` threads at once.
pub fn concurrent_clean(
    scenario: &Scenario,
    mapping: &Arc<Mapping>,
    threads: usize,
) -> Vec<SyncResult<PassReport>> {
    let barrier = &Barrier::new(threads);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    scenario.cleaner(mapping).run()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("Cleaner thread panicked"))
            .collect()
    })
}
