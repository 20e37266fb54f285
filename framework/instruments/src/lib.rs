mod report;

pub use report::{
    InMemoryReporter, ReportCollector, ReportConfig, ReportMetric, Reporter,
};

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single timed operation, the unit the benchmark report is built from.
///
/// Create the record just before starting the operation, then pass it together with the
/// operation's result to [Reporter::add_operation]. The elapsed wall-clock time is stamped at
/// that point, so every reported record carries a duration measurement.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    operation_id: String,
    attr: HashMap<String, String>,
    started: Instant,
    elapsed: Option<Duration>,
    is_error: bool,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            attr: HashMap::new(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
        }
    }

    /// Attach an attribute which will be reported as a tag on the measurement. For example the
    /// notebook being rendered or the browser engine driving the page.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attr.insert(key.into(), value.into());
        self
    }

    /// Stamp the elapsed time and the outcome of the operation.
    pub fn finish<T, E>(mut self, response: &Result<T, E>) -> Self {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = response.is_err();
        self
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn attr(&self) -> &HashMap<String, String> {
        &self.attr
    }

    /// The measured duration. `None` until [OperationRecord::finish] has been called.
    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}
