use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use influxdb::{Client, InfluxDbWriteable, Timestamp, WriteQuery};
use influxive_core::DataType;
use tokio::runtime::Runtime;
use tokio::select;
use tokio::sync::mpsc::UnboundedSender;

use render_tunnel_core::prelude::DelegatedShutdownListener;

use crate::report::{ReportCollector, ReportMetric};
use crate::OperationRecord;

/// Ships operation durations and custom metrics to an InfluxDB instance.
///
/// Configured from the environment: `INFLUX_HOST`, `INFLUX_BUCKET` and `INFLUX_TOKEN`. Points
/// are queued onto a background write task so that reporting never blocks an agent; queued
/// points are drained when the scenario shuts down.
pub struct InfluxClientReporter {
    writer: UnboundedSender<WriteQuery>,
    flush_complete: Arc<AtomicBool>,
}

impl InfluxClientReporter {
    pub fn new(
        runtime: &Runtime,
        shutdown_listener: DelegatedShutdownListener,
    ) -> anyhow::Result<Self> {
        let client = Client::new(
            std::env::var("INFLUX_HOST").context(
                "Cannot configure the influx reporter without environment variable `INFLUX_HOST`",
            )?,
            std::env::var("INFLUX_BUCKET").context(
                "Cannot configure the influx reporter without environment variable `INFLUX_BUCKET`",
            )?,
        )
        .with_token(std::env::var("INFLUX_TOKEN").context(
            "Cannot configure the influx reporter without environment variable `INFLUX_TOKEN`",
        )?);

        let flush_complete = Arc::new(AtomicBool::new(false));
        let writer = start_write_task(runtime, shutdown_listener, client, flush_complete.clone());

        Ok(Self {
            writer,
            flush_complete,
        })
    }

    fn try_send(&self, query: WriteQuery) {
        if let Err(e) = self.writer.send(query) {
            log::warn!("Failed to queue metric for InfluxDB: {}", e);
        }
    }
}

impl ReportCollector for InfluxClientReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        let Some(elapsed) = operation_record.duration() else {
            log::warn!(
                "Operation record for [{}] has no duration, dropping it",
                operation_record.operation_id()
            );
            return;
        };

        let mut query = Timestamp::Nanoseconds(now_nanos())
            .into_query("rt.instruments.operation_duration")
            .add_field("value", elapsed.as_secs_f64() * 1000.0)
            .add_tag("operation_id", operation_record.operation_id().to_string())
            .add_tag("is_error", operation_record.is_error().to_string());

        for (k, v) in operation_record.attr() {
            query = query.add_tag(k, v.to_string());
        }

        self.try_send(query);
    }

    fn add_custom(&mut self, metric: ReportMetric) {
        let metric = metric.into_inner();

        let mut query = Timestamp::Nanoseconds(
            metric
                .timestamp
                .duration_since(SystemTime::UNIX_EPOCH)
                .expect("SystemTime before UNIX_EPOCH")
                .as_nanos(),
        )
        .into_query(metric.name.into_string());

        for (k, v) in metric.fields {
            query = query.add_field(k.into_string(), v.into_type());
        }

        for (k, v) in metric.tags {
            query = query.add_tag(k.into_string(), v.into_type());
        }

        self.try_send(query);
    }

    fn finalize(&self) {
        // The write task drains outstanding points when the shutdown signal fires. Wait for
        // that to finish so the last points of the run are not lost when the process exits.
        let wait_started = std::time::Instant::now();
        while !self.flush_complete.load(Ordering::Acquire) {
            if wait_started.elapsed() > Duration::from_secs(30) {
                log::warn!("Timed out waiting for metrics to flush to InfluxDB");
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("SystemTime before UNIX_EPOCH")
        .as_nanos()
}

fn start_write_task(
    runtime: &Runtime,
    mut shutdown_listener: DelegatedShutdownListener,
    client: Client,
    flush_complete: Arc<AtomicBool>,
) -> UnboundedSender<WriteQuery> {
    let (writer, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    runtime.spawn(async move {
        loop {
            select! {
                _ = shutdown_listener.wait_for_shutdown() => {
                    log::debug!("Shutting down influx reporter");
                    break;
                }
                query = receiver.recv() => {
                    if let Some(query) = query {
                        if let Err(e) = client.query(query).await {
                            log::warn!("Failed to send metric to InfluxDB: {}", e);
                        }
                    } else {
                        break;
                    }
                }
            }
        }

        let mut drain_count = 0;
        while let Ok(query) = receiver.try_recv() {
            if let Err(e) = client.query(query).await {
                log::warn!("Failed to send metric to InfluxDB: {}", e);
            }
            drain_count += 1;
        }

        log::debug!("Drained {} remaining metrics", drain_count);
        flush_complete.store(true, Ordering::Release);
    });
    writer
}

trait DataTypeExt {
    fn into_type(self) -> influxdb::Type;
}

impl DataTypeExt for DataType {
    fn into_type(self) -> influxdb::Type {
        match self {
            DataType::Bool(b) => influxdb::Type::Boolean(b),
            DataType::F64(f) => influxdb::Type::Float(f),
            DataType::I64(i) => influxdb::Type::SignedInteger(i),
            DataType::U64(u) => influxdb::Type::UnsignedInteger(u),
            DataType::String(s) => influxdb::Type::Text(s.into_string()),
        }
    }
}
