mod operations_table;

use std::collections::BTreeMap;

use tabled::settings::Style;
use tabled::Table;

use crate::report::{ReportCollector, ReportMetric};
use crate::OperationRecord;

use operations_table::OperationRow;

/// Keeps every operation in memory and prints a per-operation statistics table at the end of the
/// run. This is the reporter you want while developing scenarios or running one-off benchmarks.
pub struct InMemoryReporter {
    operation_records: Vec<OperationRecord>,
}

impl Default for InMemoryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self {
            operation_records: Vec::new(),
        }
    }

    /// Number of recorded operations with the given id.
    pub fn operation_count(&self, operation_id: &str) -> usize {
        self.operation_records
            .iter()
            .filter(|record| record.operation_id() == operation_id)
            .count()
    }

    fn summary_rows(&self) -> Vec<OperationRow> {
        let mut grouped: BTreeMap<&str, Vec<&OperationRecord>> = BTreeMap::new();
        for record in &self.operation_records {
            grouped.entry(record.operation_id()).or_default().push(record);
        }

        grouped
            .into_iter()
            .map(|(operation_id, records)| {
                let durations_micro: Vec<u128> = records
                    .iter()
                    .filter_map(|record| record.duration())
                    .map(|d| d.as_micros())
                    .collect();
                let errors = records.iter().filter(|record| record.is_error()).count();

                let total_micro: u128 = durations_micro.iter().sum();
                let avg_ms = if durations_micro.is_empty() {
                    0.0
                } else {
                    (total_micro as f64 / durations_micro.len() as f64) / 1000.0
                };

                OperationRow {
                    operation_id: operation_id.to_string(),
                    total_operations: records.len(),
                    errors,
                    avg_time_ms: avg_ms,
                    min_time_ms: durations_micro.iter().min().copied().unwrap_or(0) as f64
                        / 1000.0,
                    max_time_ms: durations_micro.iter().max().copied().unwrap_or(0) as f64
                        / 1000.0,
                    total_duration_ms: total_micro as f64 / 1000.0,
                }
            })
            .collect()
    }

    fn print_summary_of_operations(&self) {
        if self.operation_records.is_empty() {
            println!("\nNo operations were recorded");
            return;
        }

        println!("\nSummary of operations");
        let mut table = Table::new(self.summary_rows());
        table.with(Style::modern());

        println!("{table}");
    }
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn add_custom(&mut self, _metric: ReportMetric) {
        // Custom metrics only go to metrics backends.
    }

    fn finalize(&self) {
        self.print_summary_of_operations();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(id: &str, ok: bool) -> OperationRecord {
        let record = OperationRecord::new(id);
        if ok {
            record.finish(&Ok::<_, anyhow::Error>(()))
        } else {
            record.finish(&Err::<(), _>(anyhow::anyhow!("failed")))
        }
    }

    #[test]
    fn counts_operations_by_id() {
        let mut reporter = InMemoryReporter::new();
        reporter.add_operation(&finished("render_notebook", true));
        reporter.add_operation(&finished("page_screenshot", true));

        assert_eq!(reporter.operation_count("render_notebook"), 1);
        assert_eq!(reporter.operation_count("page_screenshot"), 1);
        assert_eq!(reporter.operation_count("page_close"), 0);
    }

    #[test]
    fn summary_groups_by_operation_and_counts_errors() {
        let mut reporter = InMemoryReporter::new();
        reporter.add_operation(&finished("page_goto", true));
        reporter.add_operation(&finished("page_goto", false));

        let rows = reporter.summary_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operation_id, "page_goto");
        assert_eq!(rows[0].total_operations, 2);
        assert_eq!(rows[0].errors, 1);
        assert!(rows[0].max_time_ms >= rows[0].min_time_ms);
    }

    #[test]
    fn all_error_group_does_not_panic() {
        let mut reporter = InMemoryReporter::new();
        reporter.add_operation(&finished("page_goto", false));

        let rows = reporter.summary_rows();
        assert_eq!(rows[0].errors, 1);
        reporter.finalize();
    }
}
