//! Bounded worker pool over a shared queue.
//!
//! Workers are plain futures joined on the caller's task, so the pool bounds
//! how many items are in flight without spawning. Any CPU-heavy work inside
//! `f` is expected to offload itself (the decoder and encoder do).

use futures_util::future::try_join_all;
use std::collections::VecDeque;
use std::future::Future;
use tokio::sync::Mutex;

/// Drain `items` with at most `workers` concurrent invocations of `f`.
///
/// Each worker pops the next pending item, runs `f` to completion, appends
/// the result and repeats. Results are in completion order. The first error
/// is returned and the remaining workers are dropped at their next
/// suspension point.
pub async fn drain_with_workers<T, R, E, F, Fut>(
    items: VecDeque<T>,
    workers: usize,
    f: F,
) -> Result<Vec<R>, E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, total);
    tracing::trace!("Draining {} item(s) with {} worker(s)", total, workers);

    let queue = Mutex::new(items);
    let results = Mutex::new(Vec::with_capacity(total));
    let (queue, results, f) = (&queue, &results, &f);

    let worker = move |id: usize| async move {
        loop {
            let next = queue.lock().await.pop_front();
            let Some(item) = next else {
                tracing::trace!("Worker {} idle", id);
                break;
            };
            let result = f(item).await?;
            results.lock().await.push(result);
        }
        Ok::<(), E>(())
    };

    try_join_all((0..workers).map(worker)).await?;
    let out: Vec<R> = results.lock().await.drain(..).collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_queue() {
        let out: Result<Vec<u32>, ()> =
            drain_with_workers(VecDeque::new(), 2, |x: u32| async move { Ok(x) }).await;
        assert!(out.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_items_processed() {
        let items: VecDeque<u32> = (1..=10).collect();
        let mut out: Vec<u32> = drain_with_workers(items, 3, |x| async move {
            tokio::task::yield_now().await;
            Ok::<_, ()>(x * 10)
        })
        .await
        .unwrap();
        out.sort_unstable();
        assert_eq!(out, (1..=10).map(|x| x * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let items: VecDeque<u64> = (0..8).collect();

        drain_with_workers(items, 2, |_| {
            let (in_flight, peak) = (&in_flight, &peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            }
        })
        .await
        .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_item_uses_one_worker() {
        let calls = AtomicUsize::new(0);
        let items: VecDeque<u8> = VecDeque::from([7]);
        let out = drain_with_workers(items, 2, |x| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ()>(x) }
        })
        .await
        .unwrap();
        assert_eq!(out, vec![7]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_error_aborts() {
        let items: VecDeque<u32> = (0..6).collect();
        let result = drain_with_workers(items, 2, |x| async move {
            if x == 3 {
                Err(format!("item {x} failed"))
            } else {
                Ok(x)
            }
        })
        .await;
        assert_eq!(result.unwrap_err(), "item 3 failed");
    }
}
