use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{PoisonError, RwLock};

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 20_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static ROLL_NO_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Roll numbers compare case-insensitively, like the column collation.
#[inline]
pub fn normalize(roll_no: &str) -> String {
    roll_no.trim().to_lowercase()
}

/// False means the roll number is definitely unused; true may be a false positive.
pub fn might_exist(roll_no: &str) -> bool {
    let roll_no = normalize(roll_no);
    ROLL_NO_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&roll_no)
}

pub fn insert(roll_no: &str) {
    let roll_no = normalize(roll_no);
    ROLL_NO_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(&roll_no);
}

pub fn remove(roll_no: &str) {
    let roll_no = normalize(roll_no);
    ROLL_NO_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&roll_no);
}

/// Loads every existing roll number, streaming rows in batches.
pub async fn warmup_roll_no_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT roll_no FROM students").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (roll_no,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&roll_no));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    tracing::info!(total, "Roll number filter warmup complete");
    Ok(())
}

fn insert_batch(roll_nos: &[String]) {
    let mut filter = ROLL_NO_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    for roll_no in roll_nos {
        filter.add(roll_no);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_roll_numbers_are_reported() {
        insert("  FILTER-Test-001 ");
        assert!(might_exist("filter-test-001"));

        remove("filter-test-001");
        assert!(!might_exist("FILTER-TEST-001"));
    }
}
