//! Demo workload: two producer threads feed a CPU-load average and an HTTP
//! request counter while the registry flushes them to disk.
//!
//! Usage: `tally-server [config.json]`. Without a config file the defaults
//! apply (`metrics.log`, one flush per second).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use tally_common::config::{load_config, TallyConfig};
use tally_registry::MetricsRegistry;
use tracing::info;

const ROUNDS: usize = 10;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).with_context(|| format!("loading config {path}"))?,
        None => TallyConfig::default(),
    };
    let cores = thread::available_parallelism().map_or(1, |n| n.get());
    info!(cores, sink = %config.sink_path.display(), "starting workload");

    let registry = MetricsRegistry::from_config(&config).context("starting registry")?;
    let cpu = registry.average("CPU");
    let http_rps = registry.counter("HTTP requests RPS");

    let cpu_worker = {
        let cpu = Arc::clone(&cpu);
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..ROUNDS {
                cpu.add(rng.gen_range(0.0..cores as f64));
                thread::sleep(Duration::from_millis(200));
            }
        })
    };
    let http_worker = {
        let http_rps = Arc::clone(&http_rps);
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..ROUNDS {
                http_rps.increment(rng.gen_range(0..=100));
                thread::sleep(Duration::from_secs(1));
            }
        })
    };

    cpu_worker
        .join()
        .map_err(|_| anyhow::anyhow!("cpu worker panicked"))?;
    http_worker
        .join()
        .map_err(|_| anyhow::anyhow!("http worker panicked"))?;

    registry.flush_now().context("final flush")?;
    registry.shutdown();

    info!(sink = %config.sink_path.display(), "workload finished");
    Ok(())
}
