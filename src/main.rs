use log::{error, info, warn};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use sensor_series::config::{AppConfig, SourceConfig};
use sensor_series::source::{load_snapshot, SourceError, Simulator};
use sensor_series::utils::{duration_to_seconds, format_datetime, format_value};
use sensor_series::{
    FieldSet, HydroponicFields, IrrigationFields, Reading, SchemaField, SchemaVariant,
    SeriesPipeline,
};

/// Where each refresh gets its snapshot from.
enum SnapshotSource<F> {
    File(std::path::PathBuf),
    Simulated(Simulator<F>),
}

impl<F: FieldSet + DeserializeOwned> SnapshotSource<F> {
    fn new(config: &SourceConfig) -> Self {
        match config {
            SourceConfig::File(path) => SnapshotSource::File(path.clone()),
            SourceConfig::Simulated { capacity } => {
                SnapshotSource::Simulated(Simulator::new(*capacity))
            }
        }
    }

    async fn snapshot(&mut self) -> Result<Vec<Reading<F>>, SourceError> {
        match self {
            SnapshotSource::File(path) => load_snapshot(path.as_path()).await,
            SnapshotSource::Simulated(simulator) => {
                Ok(simulator.next_snapshot(OffsetDateTime::now_utc()))
            }
        }
    }
}

async fn main_loop<F: FieldSet + DeserializeOwned>(config: AppConfig) {
    let pipeline = SeriesPipeline::new(config.series);
    let mut source = SnapshotSource::<F>::new(&config.source);

    info!(
        "Starting {} series: {} ms buckets, {} chart points, average over {}",
        config.schema,
        config.series.bucket_ms,
        config.series.max_chart_points,
        config.series.avg_window
    );

    loop {
        let start_time = OffsetDateTime::now_utc();

        match source.snapshot().await {
            Ok(readings) => report(&pipeline, &readings, &start_time),
            Err(e) => error!("Refresh skipped: {}", e),
        }

        // Wait until the next refresh should start
        let elapsed = duration_to_seconds(OffsetDateTime::now_utc() - start_time);
        let wait_time = config.refresh_secs.saturating_sub(elapsed);
        if wait_time > 0 {
            sleep(Duration::from_secs(wait_time)).await;
        }
    }
}

fn report<F: FieldSet>(pipeline: &SeriesPipeline, readings: &[Reading<F>], at: &OffsetDateTime) {
    if readings.is_empty() {
        warn!("Snapshot at {} contains no readings", format_datetime(at));
        return;
    }

    let output = pipeline.process(readings);

    info!(
        "Snapshot at {}: {} readings, {} buckets, {} without a usable timestamp",
        format_datetime(at),
        readings.len(),
        output.buckets.len(),
        output.unparseable
    );

    if output.buckets.is_empty() {
        warn!("No complete bucket yet, chart shows raw readings");
    }

    if let Some(latest) = output.chart.last() {
        let values: Vec<String> = F::FIELDS
            .iter()
            .map(|field| {
                format!(
                    "{}={}",
                    field.key(),
                    format_value(latest.values.get(*field), field.decimals())
                )
            })
            .collect();
        info!("  Latest point [{}]: {}", latest.time, values.join(", "));
    }

    // Print summary
    for field in F::FIELDS {
        info!(
            "  Average {}: {}{}",
            field.label(),
            format_value(output.summary.get(*field), field.decimals()),
            field.unit()
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            // Keep the sender alive so the refresh loop is not cancelled.
            std::future::pending::<()>().await;
        }
        let _ = tx.send(());
    });

    // Run the refresh loop or wait for shutdown signal
    tokio::select! {
        _ = async {
            match config.schema {
                SchemaVariant::Hydroponic => main_loop::<HydroponicFields>(config).await,
                SchemaVariant::Irrigation => main_loop::<IrrigationFields>(config).await,
            }
        } => {}
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
