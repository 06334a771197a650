//! Response DTOs for the cache inspector API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::{AggregatedStats, CacheSettings, StatisticsReport};

/// Statistics row of one cached operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationStats {
    /// Operation id
    pub operation: String,
    /// Number of cache instances combined into this row
    pub instance_count: usize,
    pub settings: CacheSettings,
    pub hit_count: u64,
    pub miss_count: u64,
    pub request_count: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub load_count: u64,
    pub total_load_time_ms: f64,
    pub average_load_time_ms: f64,
    pub eviction_count: u64,
    /// Current number of entries
    pub entries: usize,
    /// Only present when memory estimation was requested and succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_memory_bytes: Option<u64>,
}

impl OperationStats {
    /// Creates a row from aggregated statistics
    pub fn new(operation: impl Into<String>, stats: &AggregatedStats) -> Self {
        let combined = &stats.combined;
        Self {
            operation: operation.into(),
            instance_count: stats.instance_count,
            settings: stats.settings.clone(),
            hit_count: combined.hit_count,
            miss_count: combined.miss_count,
            request_count: combined.request_count(),
            hit_rate: combined.hit_rate(),
            load_count: combined.load_count,
            total_load_time_ms: nanos_to_ms(combined.total_load_time_nanos),
            average_load_time_ms: nanos_to_ms(combined.average_load_time_nanos()),
            eviction_count: combined.eviction_count,
            entries: combined.entries,
            estimated_memory_bytes: combined.estimated_memory_bytes,
        }
    }
}

fn nanos_to_ms(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Report timestamp in ISO 8601 format
    pub generated_at: String,
    /// Whether memory was estimated
    pub estimate_memory: bool,
    /// Owner kind -> operation rows
    pub groups: BTreeMap<String, Vec<OperationStats>>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a statistics report
    pub fn new(report: &StatisticsReport, estimate_memory: bool) -> Self {
        let groups = report
            .groups
            .iter()
            .map(|(group, operations)| {
                let rows = operations
                    .iter()
                    .map(|(operation, stats)| OperationStats::new(operation.as_str(), stats))
                    .collect();
                (group.clone(), rows)
            })
            .collect();

        Self {
            generated_at: report.generated_at.to_rfc3339(),
            estimate_memory,
            groups,
        }
    }
}

/// Response body for the memory-pressure endpoint (POST /reclaim)
#[derive(Debug, Clone, Serialize)]
pub struct ReclaimResponse {
    /// Number of weak-held values cleared
    pub cleared: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StatsSnapshot;
    use chrono::Utc;

    fn aggregated() -> AggregatedStats {
        AggregatedStats {
            settings: CacheSettings::default(),
            instance_count: 3,
            combined: StatsSnapshot {
                hit_count: 8,
                miss_count: 2,
                load_count: 2,
                total_load_time_nanos: 4_000_000,
                eviction_count: 1,
                entries: 2,
                estimated_memory_bytes: None,
            },
        }
    }

    #[test]
    fn test_operation_stats_derived_fields() {
        let row = OperationStats::new("Svc::op", &aggregated());
        assert_eq!(row.request_count, 10);
        assert!((row.hit_rate - 0.8).abs() < 0.001);
        assert!((row.total_load_time_ms - 4.0).abs() < 0.001);
        assert!((row.average_load_time_ms - 2.0).abs() < 0.001);
        assert_eq!(row.instance_count, 3);
    }

    #[test]
    fn test_memory_estimate_omitted_when_absent() {
        let row = OperationStats::new("Svc::op", &aggregated());
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("estimated_memory_bytes"));
        assert!(json.contains("\"eviction\":\"LRU\""));
        assert!(json.contains("\"time_to_live_ms\":0"));
    }

    #[test]
    fn test_stats_response_groups_rows() {
        let mut groups = BTreeMap::new();
        let mut ops = BTreeMap::new();
        ops.insert("Svc::op".to_string(), aggregated());
        groups.insert("Svc".to_string(), ops);
        let report = StatisticsReport {
            generated_at: Utc::now(),
            groups,
        };

        let resp = StatsResponse::new(&report, false);
        assert_eq!(resp.groups["Svc"].len(), 1);
        assert_eq!(resp.groups["Svc"][0].operation, "Svc::op");
        assert!(!resp.estimate_memory);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
