mod args;
mod logging;
mod oracle;
mod workload;

use clap::Parser;
use tracing::Level;

use crate::args::{Args, SimConfig};
use crate::logging::{EventLog, LogWriter};
use crate::oracle::Oracle;

fn main() {
    let args = Args::parse();
    let config = SimConfig::from_args(args);
    let writer = LogWriter::new(config.log.clone()).unwrap_or_else(|err| {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let config_json = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
    tracing::info!("config: {}", config_json);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| {
            eprintln!("failed to start tokio runtime: {err}");
            std::process::exit(1);
        });

    let mut events = EventLog::new(config.first_events, config.tail_events);
    let observations = match runtime.block_on(workload::run(&config, &mut events)) {
        Ok(observations) => observations,
        Err(err) => {
            events.dump_failure(&format!("workload aborted: {err}"));
            std::process::exit(1);
        }
    };

    if let Err(reason) = Oracle::check(&observations) {
        events.dump_failure(&reason);
        std::process::exit(1);
    }

    tracing::info!(
        "complete: seed={} inserts={} producers={} samples={} tasks={} sampler_timed_out={}",
        config.seed,
        observations.final_count,
        config.producers,
        observations.samples.len(),
        observations.executed,
        observations.sampler_timed_out
    );
}
