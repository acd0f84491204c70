//! Bounded worker pool for parallel backend operations.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread;

/// Run `task` over every item on up to `max_workers` OS threads and
/// return one result per item. Results arrive in completion order, not
/// input order. Tasks must not panic; callers that cannot rule a panic
/// out wrap their task body in `catch_unwind` and fold the panic into
/// their result type.
pub fn run_bounded<T, R, F>(items: Vec<T>, max_workers: usize, task: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = max_workers.max(1).min(items.len());
    let queue = Mutex::new(VecDeque::from(items));
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let task = &task;
            scope.spawn(move || loop {
                let item = {
                    let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
                    queue.pop_front()
                };
                let Some(item) = item else { break };
                if tx.send(task(item)).is_err() {
                    break;
                }
            });
        }
        drop(tx);
        rx.into_iter().collect()
    })
}
