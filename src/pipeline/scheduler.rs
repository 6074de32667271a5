use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Cooperative stop signal shared by the scheduler and running pipelines.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Triggers on the first Ctrl-C.
    pub fn listen_for_ctrl_c(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received: finishing in-flight repositories, starting no new ones");
                shutdown.trigger();
            }
        });
    }
}

/// What became of one scheduled item.
#[derive(Debug)]
pub enum Scheduled<R> {
    Finished(R),
    /// Shutdown was triggered before the item got a slot
    NotStarted,
    Panicked(String),
}

/// Runs `task` once per item with at most `limit` running at a time.
///
/// Items are submitted in order; each one waits for a free slot before it is
/// spawned. A slot is held until the task's future completes (or unwinds), so
/// a failing task cannot leak it. Returns once every spawned task has joined,
/// with results in item order.
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    limit: usize,
    shutdown: &Shutdown,
    task: F,
) -> Vec<(T, Scheduled<R>)>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();
    let mut results: Vec<Option<Scheduled<R>>> = items.iter().map(|_| None).collect();
    let mut spawned = vec![false; items.len()];

    for (index, item) in items.iter().enumerate() {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        if shutdown.is_triggered() {
            drop(permit);
            continue;
        }

        debug!("Scheduling item {}/{}", index + 1, items.len());
        let future = task(item.clone());
        spawned[index] = true;
        join_set.spawn(async move {
            let output = future.await;
            drop(permit);
            (index, output)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, output)) => results[index] = Some(Scheduled::Finished(output)),
            Err(e) => error!("Pipeline task failed: {e}"),
        }
    }

    // A panicked task takes its index with it: spawned items without a result panicked.
    items
        .into_iter()
        .zip(results)
        .zip(spawned)
        .map(|((item, result), was_spawned)| {
            let result = match result {
                Some(result) => result,
                None if was_spawned => Scheduled::Panicked("task panicked".to_string()),
                None => Scheduled::NotStarted,
            };
            (item, result)
        })
        .collect()
}
