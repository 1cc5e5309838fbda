use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use super::roll_no_filter::normalize;

/// Positive cache of taken roll numbers: a hit means "taken".
pub static ROLL_NO_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

pub async fn mark_taken(roll_no: &str) {
    ROLL_NO_CACHE.insert(normalize(roll_no), true).await;
}

pub async fn release(roll_no: &str) {
    ROLL_NO_CACHE.invalidate(&normalize(roll_no)).await;
}

pub async fn is_taken(roll_no: &str) -> bool {
    ROLL_NO_CACHE
        .get(&normalize(roll_no))
        .await
        .unwrap_or(false)
}

async fn batch_mark(roll_nos: &[String]) {
    let futures: Vec<_> = roll_nos
        .iter()
        .map(|r| ROLL_NO_CACHE.insert(normalize(r), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// Caches roll numbers of students added in the last `days` days, which are
/// the ones most likely to be re-entered by mistake.
pub async fn warmup_roll_no_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT roll_no
        FROM students
        WHERE created_at >= NOW() - INTERVAL ? DAY
        ORDER BY created_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (roll_no,) = row?;
        batch.push(roll_no);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    tracing::info!(total_count, days, "Roll number cache warmup complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn mark_and_release() {
        mark_taken("Cache-Test-9").await;
        assert!(is_taken("cache-test-9").await);

        release("CACHE-TEST-9").await;
        assert!(!is_taken("cache-test-9").await);
    }
}
