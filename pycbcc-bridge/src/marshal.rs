//! Metrics and metadata as plain maps for the caller.
//!
//! Best effort: a value that cannot be represented is logged and its key is
//! left out; the rest of the map is still produced.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::engine::{QueryMetadata, QueryMetrics};

fn duration_nanos(name: &str, duration: Duration) -> Option<Value> {
    match u64::try_from(duration.as_nanos()) {
        Ok(nanos) => Some(Value::from(nanos)),
        Err(_) => {
            tracing::warn!(field = name, "duration does not fit in u64 nanoseconds; skipped");
            None
        }
    }
}

/// `elapsed_time` and `execution_time` as integer nanoseconds, plus the counters.
pub fn marshal_metrics(metrics: &QueryMetrics) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(v) = duration_nanos("elapsed_time", metrics.elapsed_time) {
        out.insert("elapsed_time".to_string(), v);
    }
    if let Some(v) = duration_nanos("execution_time", metrics.execution_time) {
        out.insert("execution_time".to_string(), v);
    }
    out.insert("result_count".to_string(), Value::from(metrics.result_count));
    out.insert("result_size".to_string(), Value::from(metrics.result_size));
    out.insert(
        "processed_objects".to_string(),
        Value::from(metrics.processed_objects),
    );
    out
}

pub fn marshal_metadata(metadata: &QueryMetadata) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(
        "request_id".to_string(),
        Value::String(metadata.request_id.clone()),
    );

    let mut warnings = Vec::with_capacity(metadata.warnings.len());
    for warning in &metadata.warnings {
        match serde_json::to_value(warning) {
            Ok(v) => warnings.push(v),
            Err(e) => tracing::warn!(code = warning.code, error = %e, "skipping query warning"),
        }
    }
    out.insert("warnings".to_string(), Value::Array(warnings));
    out.insert(
        "metrics".to_string(),
        Value::Object(marshal_metrics(&metadata.metrics)),
    );
    out
}
