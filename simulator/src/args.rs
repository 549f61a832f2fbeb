use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Concurrent insert/count workload against a sqlite-task-queue")]
pub(crate) struct Args {
    /// Total rows inserted across all producers.
    #[arg(long, default_value_t = 10_000)]
    pub(crate) inserts: u64,
    #[arg(long, default_value_t = 4)]
    pub(crate) producers: usize,
    /// Gap between count samples.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10ms")]
    pub(crate) interval: Duration,
    /// Upper bound on how long the sampler runs.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    pub(crate) duration: Duration,
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Chance that a producer sleeps after an insert.
    #[arg(long, default_value_t = 0.05)]
    pub(crate) sleep_rate: f64,
    #[arg(long, default_value_t = 5)]
    pub(crate) max_sleep_ms: u64,
    /// Use a file-backed database instead of memory.
    #[arg(long)]
    pub(crate) db: Option<PathBuf>,
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    #[arg(long)]
    pub(crate) quick: bool,
    #[arg(long)]
    pub(crate) stress: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimConfig {
    pub(crate) inserts: u64,
    pub(crate) producers: usize,
    pub(crate) interval_ms: u64,
    pub(crate) duration_ms: u64,
    pub(crate) seed: u64,
    pub(crate) sleep_rate: f64,
    pub(crate) max_sleep_ms: u64,
    pub(crate) db: Option<PathBuf>,
    pub(crate) log: Option<PathBuf>,
    pub(crate) preset: Option<String>,
    pub(crate) first_events: usize,
    pub(crate) tail_events: usize,
}

impl SimConfig {
    pub(crate) fn from_args(args: Args) -> Self {
        let mut config = SimConfig {
            inserts: args.inserts,
            producers: args.producers.max(1),
            interval_ms: millis(args.interval).max(1),
            duration_ms: millis(args.duration),
            seed: args.seed.unwrap_or_else(random_seed),
            sleep_rate: clamp_rate(args.sleep_rate),
            max_sleep_ms: args.max_sleep_ms,
            db: args.db,
            log: args.log,
            preset: None,
            first_events: 20,
            tail_events: 60,
        };

        if args.quick {
            config.apply_quick();
        }
        if args.stress {
            config.apply_stress();
        }

        config
    }

    pub(crate) fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub(crate) fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    fn apply_quick(&mut self) {
        self.preset = Some("quick".to_string());
        self.inserts = 200;
        self.producers = 2;
        self.interval_ms = 5;
        self.duration_ms = 10_000;
        self.sleep_rate = 0.02;
        self.max_sleep_ms = 2;
    }

    fn apply_stress(&mut self) {
        self.preset = Some("stress".to_string());
        self.inserts = 100_000;
        self.producers = 32;
        self.interval_ms = 2;
        self.duration_ms = 300_000;
        self.sleep_rate = 0.01;
        self.max_sleep_ms = 3;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn clamp_rate(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    now.as_secs() ^ u64::from(now.subsec_nanos())
}
