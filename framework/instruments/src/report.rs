mod in_memory_reporter;
mod influx_client_reporter;

use std::ops::Deref;
use std::sync::Arc;

use influxive_core::{Metric, StringType};
use parking_lot::Mutex;
use render_tunnel_core::prelude::DelegatedShutdownListener;

use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;
pub use influx_client_reporter::InfluxClientReporter;

/// A simple, opinionated, newtype for the influxive_core::Metric type.
///
/// The reported timestamp for the metric will be the current time when the metric is created.
/// The name you choose will be transformed into `rt.custom.<name>`.
pub struct ReportMetric(Metric);

impl ReportMetric {
    pub fn new(name: &str) -> Self {
        Self(Metric::new(
            std::time::SystemTime::now(),
            format!("rt.custom.{}", name),
        ))
    }

    pub fn with_field<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<StringType>,
        V: Into<influxive_core::DataType>,
    {
        self.0 = self.0.with_field(name, value);
        self
    }

    pub fn with_tag<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<StringType>,
        V: Into<influxive_core::DataType>,
    {
        self.0 = self.0.with_tag(name, value);
        self
    }

    pub(crate) fn into_inner(self) -> Metric {
        self.0
    }
}

impl Clone for ReportMetric {
    fn clone(&self) -> Self {
        let mut new_inner = Metric::new(self.timestamp, self.name.clone());
        for (k, v) in &self.fields {
            new_inner = new_inner.with_field(k.clone(), v.clone());
        }
        for (k, v) in &self.tags {
            new_inner = new_inner.with_tag(k.clone(), v.clone());
        }
        Self(new_inner)
    }
}

impl Deref for ReportMetric {
    type Target = Metric;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub trait ReportCollector {
    /// Record a completed operation. The record must have been finished so that it carries a
    /// duration measurement.
    fn add_operation(&mut self, operation_record: &OperationRecord);

    /// Record a custom metric, reported alongside the operation durations.
    fn add_custom(&mut self, metric: ReportMetric);

    fn finalize(&self);
}

/// Fans measurements out to every configured collector.
///
/// Cheap to share between agents, each collector is locked independently.
pub struct Reporter {
    collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>>,
}

impl Reporter {
    pub fn add_operation(&self, operation_record: OperationRecord) {
        for collector in &self.collectors {
            collector.lock().add_operation(&operation_record);
        }
    }

    pub fn add_custom(&self, metric: ReportMetric) {
        for collector in &self.collectors {
            collector.lock().add_custom(metric.clone());
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.lock().finalize();
        }
    }
}

/// Chooses which collectors a [Reporter] is built with.
///
/// With no collectors enabled the reporter is a no-op, which is what the runner's tests use.
#[derive(Debug, Default)]
pub struct ReportConfig {
    enable_in_memory: bool,
    enable_influx_client: bool,
}

impl ReportConfig {
    pub fn enable_in_memory(mut self) -> Self {
        self.enable_in_memory = true;
        self
    }

    pub fn enable_influx_client(mut self) -> Self {
        self.enable_influx_client = true;
        self
    }

    pub fn init(
        self,
        runtime: &tokio::runtime::Runtime,
        shutdown_listener: DelegatedShutdownListener,
    ) -> anyhow::Result<Arc<Reporter>> {
        let mut collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>> = Vec::new();

        if self.enable_in_memory {
            collectors.push(Mutex::new(Box::new(InMemoryReporter::new())));
        }

        if self.enable_influx_client {
            collectors.push(Mutex::new(Box::new(InfluxClientReporter::new(
                runtime,
                shutdown_listener,
            )?)));
        }

        Ok(Arc::new(Reporter { collectors }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_accepts_operations() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = render_tunnel_core::prelude::ShutdownHandle::new();

        let reporter = ReportConfig::default()
            .init(&runtime, handle.new_listener())
            .unwrap();

        let record = OperationRecord::new("page_goto").finish(&Ok::<_, anyhow::Error>(()));
        reporter.add_operation(record);
        reporter.finalize();
    }
}
