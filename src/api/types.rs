//! Backend Data Types
//!
//! Request and response bodies exchanged with the analytics backend.
//! Every dataset is replaced wholesale on refresh, so these are plain
//! owned values with no merge semantics.

use serde::{Deserialize, Serialize};

/// `GET /health`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: bool,
    /// Whether the backend's question-answering agent is available
    #[serde(default)]
    pub langchain: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// `GET /api/dashboard/metrics`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSummary {
    pub total_enrollments: u64,
    pub total_bio_updates: u64,
    pub total_demo_updates: u64,
    pub national_bio_ratio: f64,
    pub national_demo_ratio: f64,
    pub crisis_districts_count: u64,
}

/// One row of `GET /api/dashboard/states`, in backend rank order
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StateRanking {
    pub state: String,
    pub bio_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollments: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio_updates: Option<u64>,
}

/// One row of `GET /api/dashboard/crisis-districts`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CrisisDistrict {
    pub state: String,
    pub district: String,
    pub enrollments: u64,
    pub bio_updates: u64,
    pub bio_ratio: f64,
    /// Null when the backend could not score the district
    #[serde(default)]
    pub z_score: Option<f64>,
}

/// `GET /api/dashboard/filters`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FilterOptions {
    #[serde(default)]
    pub states: Vec<String>,
}

/// `POST /api/chat/` body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub question: String,
}

/// `POST /api/chat/` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChatReply {
    pub success: bool,
    #[serde(default)]
    pub answer: Option<String>,
    /// Chart specification produced by the backend, passed through verbatim
    #[serde(default)]
    pub chart_data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}
