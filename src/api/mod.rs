//! Backend API
//!
//! Client for the analytics backend. The backend owns all ranking,
//! z-score and answer generation; this side only fetches and decodes.
//!
//! # Endpoints
//!
//! - `GET /health` - Backend health and component flags
//! - `GET /api/dashboard/metrics` - National summary
//! - `GET /api/dashboard/states?limit=N` - State rankings by bio ratio
//! - `GET /api/dashboard/crisis-districts?limit=N` - Outlier districts
//! - `GET /api/dashboard/filters` - Filter options
//! - `POST /api/chat/` - Ask the assistant a question

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, Backend, DEFAULT_CRISIS_LIMIT, DEFAULT_STATES_LIMIT};
pub use error::{ApiResult, FailureCause, RequestFailed};
pub use types::{
    ChatReply, ChatRequest, CrisisDistrict, FilterOptions, HealthStatus, MetricsSummary,
    StateRanking,
};
