mod cli;

use crate::cli::Args;
use anyhow::{Context, Result};
use clap::Parser;
use latency_plot::config::Config;
use latency_plot::plot::LatencyPlot;
use latency_plot::results::{self, Measurement};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

fn init_tracing() -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,latency_plot=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<Measurement>> {
    if path.as_os_str() == "-" {
        return results::read_measurements(io::stdin().lock()).context("failed to decode stdin");
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    results::read_measurements(BufReader::new(file))
        .with_context(|| format!("failed to decode {}", path.display()))
}

fn main() -> Result<()> {
    init_tracing()?;

    let args = Args::parse();
    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    let mut batches = Vec::new();
    for path in args.inputs() {
        let batch = read_input(&path)?;
        tracing::debug!(input = %path.display(), results = batch.len(), "read results");
        batches.push(batch);
    }
    let measurements = results::merge_by_timestamp(batches);

    let mut plot = LatencyPlot::new(config.title.clone(), config.threshold)?;
    for measurement in &measurements {
        plot.add(measurement);
    }
    let plot = plot.finalize();

    let options = config.display_options();
    let assets = config.assets()?;
    let written = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            plot.write_to(BufWriter::new(file), &options, &assets)
                .with_context(|| format!("failed to write {}", path.display()))?
        }
        None => plot
            .write_to(io::stdout().lock(), &options, &assets)
            .context("failed to write plot to stdout")?,
    };

    tracing::info!(
        results = measurements.len(),
        series = plot.series().count(),
        bytes = written,
        "wrote latency plot"
    );

    Ok(())
}
