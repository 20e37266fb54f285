use tabled::Tabled;

#[derive(Tabled)]
pub struct OperationRow {
    #[tabled(rename = "Operation")]
    pub operation_id: String,
    #[tabled(rename = "Avg (ms)", display = "float2")]
    pub avg_time_ms: f64,
    #[tabled(rename = "Min (ms)", display = "float2")]
    pub min_time_ms: f64,
    #[tabled(rename = "Max (ms)", display = "float2")]
    pub max_time_ms: f64,
    #[tabled(rename = "Count")]
    pub total_operations: usize,
    #[tabled(rename = "Errors")]
    pub errors: usize,
    #[tabled(rename = "Total (ms)", display = "float2")]
    pub total_duration_ms: f64,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
