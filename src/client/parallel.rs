//! Bounded concurrent fetching of independent upstream items.
//!
//! Each item resolves on its own; one failure never cancels the others.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;

use crate::error::ProviderError;

/// Fetch every key with at most `max_concurrent` requests in flight.
///
/// # Returns
///
/// One `(key, result)` pair per input key, in input order.
///
/// # Example
///
/// ```ignore
/// let results = fetch_each(
///     tickers,
///     |ticker| async move { quotes.fetch_history(&ticker, RangeKey::OneYear).await },
///     4,
/// ).await;
/// ```
pub async fn fetch_each<K, T, F, Fut>(
    keys: Vec<K>,
    fetch: F,
    max_concurrent: usize,
) -> Vec<(K, Result<T, ProviderError>)>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    if keys.is_empty() {
        return Vec::new();
    }

    let max_concurrent = max_concurrent.max(1);
    debug!(
        "Fetching {} items with max {} concurrent",
        keys.len(),
        max_concurrent
    );

    let total = keys.len();
    let mut slots: Vec<Option<(K, Result<T, ProviderError>)>> = (0..total).map(|_| None).collect();
    let mut pending = keys.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();

    let start = |index: usize, key: K| {
        let fut = fetch(key.clone());
        async move { (index, key, fut.await) }
    };

    for (index, key) in pending.by_ref().take(max_concurrent) {
        in_flight.push(start(index, key));
    }

    while let Some((index, key, result)) = in_flight.next().await {
        if let Err(ref err) = result {
            debug!("Item {} failed: {}", index, err);
        }
        slots[index] = Some((key, result));

        if let Some((next_index, next_key)) = pending.next() {
            in_flight.push(start(next_index, next_key));
        }
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fetch_each_empty() {
        let results: Vec<(u32, Result<u32, _>)> =
            fetch_each(vec![], |k| async move { Ok(k) }, 4).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_each_keeps_input_order() {
        let results = fetch_each(
            vec![30u64, 10, 20],
            |delay| async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                Ok(delay * 2)
            },
            3,
        )
        .await;

        let keys: Vec<u64> = results.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![30, 10, 20]);
        assert_eq!(*results[0].1.as_ref().unwrap(), 60);
    }

    #[tokio::test]
    async fn test_fetch_each_respects_concurrency() {
        let concurrent_count = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let results = fetch_each(
            vec![1, 2, 3, 4, 5],
            |item| {
                let cc = concurrent_count.clone();
                let mo = max_observed.clone();
                async move {
                    let current = cc.fetch_add(1, Ordering::SeqCst) + 1;
                    mo.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                    cc.fetch_sub(1, Ordering::SeqCst);
                    Ok(item)
                }
            },
            2,
        )
        .await;

        assert_eq!(results.len(), 5);
        assert!(max_observed.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_fetch_each_isolates_failures() {
        let results = fetch_each(
            vec!["BZ=F", "GC=F", "SI=F"],
            |ticker| async move {
                if ticker == "GC=F" {
                    Err(ProviderError::NoData(ticker.to_string()))
                } else {
                    Ok(ticker.len())
                }
            },
            10,
        )
        .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }
}
