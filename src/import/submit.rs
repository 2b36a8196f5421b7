//! Bounded Concurrent Submission
//!
//! Runs an async unit of work over a sequence of inputs with at most
//! `limit` of them outstanding. Work is started in input order; results
//! come back in completion order and are put back into input order
//! before returning.
//!
//! Everything runs on the calling task: concurrency here means
//! outstanding requests, not threads.

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Completion progress of a bounded run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Rounded completion percentage, 100 for an empty run
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let completed = self.completed.min(self.total) as f64;
        (completed * 100.0 / self.total as f64).round() as u8
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Map `work` over `items` with at most `limit` futures in flight
///
/// `on_progress` is called after every successful completion. The first
/// failure is returned immediately; outstanding work is dropped and its
/// results are never observed.
pub async fn map_limit<T, R, E, F, Fut, P>(
    items: Vec<T>,
    limit: usize,
    work: F,
    mut on_progress: P,
) -> Result<Vec<R>, E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    P: FnMut(Progress),
{
    let total = items.len();
    let limit = limit.max(1);

    let mut slots: Vec<Option<R>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);

    let work = &work;
    let mut in_flight = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move { (index, work(item).await) })
        .buffer_unordered(limit);

    let mut completed = 0;
    while let Some((index, result)) = in_flight.next().await {
        slots[index] = Some(result?);
        completed += 1;
        on_progress(Progress::new(completed, total));
    }

    Ok(slots.into_iter().flatten().collect())
}
