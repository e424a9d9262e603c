//! # UIDAI Dashboard
//!
//! Async client for the UIDAI analytics backend. Renders national
//! enrollment metrics, state rankings and crisis districts, and hosts a
//! question-answering chat with the backend's assistant.
//!
//! All analytics (ranking, z-scores, answers) live in the backend; this
//! crate fetches, orders the loads and keeps the views consistent.
//!
//! ## Modules
//!
//! - [`api`]: Backend client and wire types
//! - [`charts`]: Chart view models and the per-panel chart registry
//! - [`dashboard`]: Load orchestration, filter state and panel view models
//! - [`chat`]: Chat transcript and the single in-flight question
//! - [`app`]: Bootstrap, shortcuts, resize debounce and teardown
//! - [`terminal`]: ratatui adapter over the view models
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uidai_dashboard::terminal::{self, Screen};
//! use uidai_dashboard::{ApiClient, App, Config, TuiChartSurface};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let api = Arc::new(ApiClient::from_config(&config.api)?);
//!     let surface = Arc::new(TuiChartSurface::new());
//!
//!     let mut app = App::new(config, api, surface.clone());
//!     app.start().await?;
//!
//!     let screen = Screen::capture(&app).await;
//!     let text = terminal::render_to_string(120, 48, |frame| {
//!         terminal::draw_screen(frame, &screen, &surface)
//!     })?;
//!     print!("{}", text);
//!
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod charts;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod format;
pub mod terminal;

pub use api::{ApiClient, ApiResult, Backend, FailureCause, RequestFailed};

pub use app::{App, AppView, BootstrapError, Debouncer, Key, KeyEvent};

pub use charts::{ChartConfig, ChartError, ChartKind, ChartRegistry, ChartSurface, SharedCharts};

pub use chat::{ChatEvent, ChatMessage, ChatSession, Language, Role, SendOutcome};

pub use config::{Config, ConfigError, LoadedConfig};

pub use dashboard::{Dashboard, DashboardSnapshot, Panel, PanelState, ViewUpdate};

pub use terminal::{Screen, TuiChartSurface};
