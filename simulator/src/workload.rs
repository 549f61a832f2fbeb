use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sqlite_task_queue::rusqlite::params;
use sqlite_task_queue::{TaskQueue, TaskQueueError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::args::SimConfig;
use crate::logging::EventLog;

const SCHEMA: &str = "DROP TABLE IF EXISTS events;
     CREATE TABLE events (id INTEGER PRIMARY KEY, producer INTEGER NOT NULL, seq INTEGER NOT NULL);";

/// Everything the oracle needs from one run.
#[derive(Debug, Default)]
pub(crate) struct Observations {
    pub(crate) expected: i64,
    /// Counts seen by the sampler, in the order they were taken.
    pub(crate) samples: Vec<i64>,
    pub(crate) final_count: i64,
    /// `(producer, seq)` for every stored row, in insertion order.
    pub(crate) rows: Vec<(i64, i64)>,
    /// Times a task started while another one was still running.
    pub(crate) overlaps: u64,
    pub(crate) executed: u64,
    pub(crate) producer_errors: Vec<String>,
    pub(crate) sampler_timed_out: bool,
}

/// Counts tasks running on the queue worker at once.
#[derive(Debug, Default)]
struct TaskGuard {
    active: AtomicUsize,
    overlaps: AtomicU64,
    executed: AtomicU64,
}

struct Running<'a>(&'a TaskGuard);

impl TaskGuard {
    fn enter(&self) -> Running<'_> {
        if self.active.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        Running(self)
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
        self.0.executed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Split `total` inserts across `producers`, earlier producers taking the remainder.
pub(crate) fn shares(total: u64, producers: usize) -> Vec<u64> {
    let producers = producers.max(1) as u64;
    let base = total / producers;
    let extra = total % producers;
    (0..producers).map(|i| base + u64::from(i < extra)).collect()
}

pub(crate) async fn run(config: &SimConfig, events: &mut EventLog) -> Result<Observations, TaskQueueError> {
    let queue = match &config.db {
        Some(path) => TaskQueue::builder()
            .path(path)
            .pragma("journal_mode=WAL")
            .open()?,
        None => TaskQueue::open_in_memory()?,
    };
    tracing::info!(connection = queue.connection_string(), "queue opened");
    queue.execute_batch(SCHEMA).await?;

    let guard = Arc::new(TaskGuard::default());
    let handles: Vec<JoinHandle<Result<u64, TaskQueueError>>> = shares(config.inserts, config.producers)
        .into_iter()
        .enumerate()
        .map(|(producer, count)| {
            tokio::spawn(produce(
                queue.clone(),
                Arc::clone(&guard),
                producer,
                count,
                config.seed,
                config.sleep_rate,
                config.max_sleep_ms,
            ))
        })
        .collect();

    let mut observations = Observations {
        expected: i64::try_from(config.inserts).unwrap_or(i64::MAX),
        ..Observations::default()
    };

    let started = Instant::now();
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let done = handles.iter().all(JoinHandle::is_finished);
        let count = count_rows(&queue, &guard).await?;
        events.record(format!(
            "t={}ms sample={count} ticket_backlog={}",
            started.elapsed().as_millis(),
            queue.pending_tickets()
        ));
        observations.samples.push(count);
        if done {
            break;
        }
        if started.elapsed() >= config.duration() {
            observations.sampler_timed_out = true;
            tracing::warn!(samples = observations.samples.len(), "sampler hit its duration bound");
            break;
        }
    }

    for (producer, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(inserted)) => events.record(format!("producer={producer} inserted={inserted}")),
            Ok(Err(err)) => observations.producer_errors.push(format!("producer {producer}: {err}")),
            Err(err) => observations.producer_errors.push(format!("producer {producer} task: {err}")),
        }
    }

    observations.final_count = count_rows(&queue, &guard).await?;
    observations.rows = queue
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT producer, seq FROM events ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<(i64, i64)>, _>>()?;
            Ok(rows)
        })
        .await?;
    queue.close().await?;

    observations.overlaps = guard.overlaps.load(Ordering::SeqCst);
    observations.executed = guard.executed.load(Ordering::SeqCst);
    Ok(observations)
}

async fn count_rows(queue: &TaskQueue, guard: &Arc<TaskGuard>) -> Result<i64, TaskQueueError> {
    let guard = Arc::clone(guard);
    queue
        .call(move |conn| {
            let _running = guard.enter();
            Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
        })
        .await
}

async fn produce(
    queue: TaskQueue,
    guard: Arc<TaskGuard>,
    producer: usize,
    count: u64,
    seed: u64,
    sleep_rate: f64,
    max_sleep_ms: u64,
) -> Result<u64, TaskQueueError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(producer as u64));
    let producer = i64::try_from(producer).unwrap_or(i64::MAX);
    let count = i64::try_from(count).unwrap_or(i64::MAX);

    for seq in 0..count {
        let guard = Arc::clone(&guard);
        queue
            .call(move |conn| {
                let _running = guard.enter();
                Ok(conn.execute(
                    "INSERT INTO events (producer, seq) VALUES (?1, ?2)",
                    params![producer, seq],
                )?)
            })
            .await?;
        if max_sleep_ms > 0 && rng.random_bool(sleep_rate) {
            tokio::time::sleep(Duration::from_millis(rng.random_range(0..=max_sleep_ms))).await;
        }
    }
    Ok(count.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Oracle;

    #[test]
    fn shares_cover_every_insert() {
        assert_eq!(shares(10, 3), vec![4, 3, 3]);
        assert_eq!(shares(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(shares(7, 0), vec![7]);
    }

    #[test]
    fn guard_counts_overlapping_entries() {
        let guard = TaskGuard::default();
        {
            let _a = guard.enter();
            let _b = guard.enter();
        }
        let _c = guard.enter();
        assert_eq!(guard.overlaps.load(Ordering::SeqCst), 1);
        assert_eq!(guard.executed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ten_thousand_inserts_satisfy_the_oracle() -> Result<(), TaskQueueError> {
        let config = SimConfig {
            inserts: 10_000,
            producers: 1,
            interval_ms: 10,
            duration_ms: 10_000,
            seed: 42,
            sleep_rate: 0.01,
            max_sleep_ms: 1,
            db: None,
            log: None,
            preset: None,
            first_events: 4,
            tail_events: 4,
        };
        let mut events = EventLog::new(config.first_events, config.tail_events);
        let observations = run(&config, &mut events).await?;
        assert!(!observations.samples.is_empty());
        assert_eq!(observations.final_count, 10_000);
        assert_eq!(Oracle::check(&observations), Ok(()));
        Ok(())
    }
}
