//! Application Bootstrap
//!
//! Health check first, then the dashboard and chat. A failed or
//! unhealthy health check leaves the app on a full-page error view
//! whose retry re-runs the whole bootstrap from scratch.
//!
//! Also owns the window-level wiring: debounced resize, the chat
//! shortcut and teardown of every chart on shutdown.

mod debounce;

pub use debounce::Debouncer;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::api::{Backend, RequestFailed};
use crate::charts::{ChartRegistry, ChartSurface, SharedCharts};
use crate::chat::ChatSession;
use crate::config::Config;
use crate::dashboard::Dashboard;

/// Why the bootstrap stopped at the error view
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Backend health check failed (status: {status})")]
    Unhealthy { status: String },

    #[error(transparent)]
    Unreachable(#[from] RequestFailed),
}

/// Top-level view
#[derive(Debug, Clone, PartialEq)]
pub enum AppView {
    Loading,
    Main,
    /// Full-page connection error with a retry action
    Fatal { message: String, backend_url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Enter,
    Other,
}

/// A key press with its modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
    /// Cmd on macOS
    pub meta: bool,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            key: Key::Char(c),
            ctrl: true,
            meta: false,
        }
    }

    /// Ctrl+K or Cmd+K
    fn is_chat_shortcut(&self) -> bool {
        (self.ctrl || self.meta) && matches!(self.key, Key::Char('k') | Key::Char('K'))
    }
}

/// Objects that live from a successful health check until shutdown
struct Session {
    charts: SharedCharts,
    dashboard: Arc<Dashboard>,
    chat: Arc<ChatSession>,
    resize: Debouncer,
}

pub struct App {
    config: Config,
    api: Arc<dyn Backend>,
    surface: Arc<dyn ChartSurface>,
    view: AppView,
    session: Option<Session>,
}

impl App {
    pub fn new(config: Config, api: Arc<dyn Backend>, surface: Arc<dyn ChartSurface>) -> Self {
        Self {
            config,
            api,
            surface,
            view: AppView::Loading,
            session: None,
        }
    }

    /// Run the bootstrap. On failure the view switches to
    /// [`AppView::Fatal`] and the error is returned.
    pub async fn start(&mut self) -> Result<(), BootstrapError> {
        tracing::info!("UIDAI AI Platform starting...");
        self.teardown().await;
        self.view = AppView::Loading;

        match self.bootstrap().await {
            Ok(session) => {
                self.session = Some(session);
                self.view = AppView::Main;
                tracing::info!("Application initialized successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Application initialization failed");
                self.view = AppView::Fatal {
                    message: e.to_string(),
                    backend_url: self.config.api.base_url.clone(),
                };
                Err(e)
            }
        }
    }

    /// Retry from the error view; a fresh bootstrap
    pub async fn retry(&mut self) -> Result<(), BootstrapError> {
        tracing::info!("Retrying connection");
        self.start().await
    }

    async fn bootstrap(&self) -> Result<Session, BootstrapError> {
        tracing::info!("Checking backend connection...");
        let health = self.api.check_health().await?;
        if !health.is_healthy() {
            return Err(BootstrapError::Unhealthy {
                status: health.status,
            });
        }
        tracing::info!(
            database = health.database,
            assistant = health.langchain,
            "Backend connection successful"
        );

        let charts = ChartRegistry::shared(self.surface.clone());
        let dashboard = Arc::new(Dashboard::new(
            self.api.clone(),
            charts.clone(),
            self.config.dashboard.clone(),
        ));
        let chat = Arc::new(ChatSession::new(
            self.api.clone(),
            charts.clone(),
            self.config.ui.default_language,
            Duration::from_millis(self.config.ui.toast_ttl_ms),
        ));

        dashboard.initialize().await;
        chat.initialize().await;

        let resize = Debouncer::spawn(Duration::from_millis(self.config.ui.resize_debounce_ms), {
            let dashboard = dashboard.clone();
            move || {
                let dashboard = dashboard.clone();
                async move { dashboard.render_charts().await }
            }
        });

        Ok(Session {
            charts,
            dashboard,
            chat,
            resize,
        })
    }

    /// Window resized; chart panels redraw once the resizing settles
    pub fn on_resize(&self) {
        if let Some(session) = &self.session {
            session.resize.trigger();
        }
    }

    /// Global shortcuts. Returns whether the key was consumed.
    pub async fn handle_key(&self, event: KeyEvent) -> bool {
        let Some(session) = &self.session else {
            return false;
        };

        if event.is_chat_shortcut() {
            session.chat.toggle().await;
            return true;
        }
        if event.key == Key::Escape && session.chat.is_open().await {
            session.chat.close().await;
            return true;
        }
        false
    }

    /// Destroy every chart before the process exits
    pub async fn shutdown(&mut self) {
        tracing::info!("Application shutting down...");
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            // A redraw still pending from a resize lands before the teardown
            session.resize.finish().await;
            session.charts.lock().await.destroy_all();
        }
    }

    pub fn view(&self) -> &AppView {
        &self.view
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> Arc<dyn Backend> {
        self.api.clone()
    }

    pub fn dashboard(&self) -> Option<Arc<Dashboard>> {
        self.session.as_ref().map(|s| s.dashboard.clone())
    }

    pub fn chat(&self) -> Option<Arc<ChatSession>> {
        self.session.as_ref().map(|s| s.chat.clone())
    }

    pub fn charts(&self) -> Option<SharedCharts> {
        self.session.as_ref().map(|s| s.charts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiResult, ChatReply, CrisisDistrict, FilterOptions, HealthStatus, MetricsSummary,
        StateRanking,
    };
    use crate::charts::testing::CountingSurface;
    use crate::charts::{CRISIS_PANEL, STATES_PANEL};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Backend whose health can be switched; data endpoints always succeed
    struct ToggleBackend {
        healthy: AtomicBool,
        reachable: AtomicBool,
        health_checks: AtomicUsize,
    }

    impl ToggleBackend {
        fn new(healthy: bool, reachable: bool) -> Self {
            Self {
                healthy: AtomicBool::new(healthy),
                reachable: AtomicBool::new(reachable),
                health_checks: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Backend for ToggleBackend {
        async fn check_health(&self) -> ApiResult<HealthStatus> {
            self.health_checks.fetch_add(1, Ordering::SeqCst);
            if !self.reachable.load(Ordering::SeqCst) {
                return Err(RequestFailed::status("/health", 503));
            }
            let status = if self.healthy.load(Ordering::SeqCst) {
                "healthy"
            } else {
                "degraded"
            };
            Ok(HealthStatus {
                status: status.to_string(),
                database: true,
                langchain: false,
            })
        }

        async fn metrics(&self) -> ApiResult<MetricsSummary> {
            Ok(MetricsSummary {
                total_enrollments: 1,
                total_bio_updates: 1,
                total_demo_updates: 1,
                national_bio_ratio: 1.0,
                national_demo_ratio: 1.0,
                crisis_districts_count: 0,
            })
        }

        async fn states(&self, _limit: usize) -> ApiResult<Vec<StateRanking>> {
            Ok(vec![StateRanking {
                state: "Kerala".to_string(),
                bio_ratio: 12.0,
                enrollments: None,
                bio_updates: None,
            }])
        }

        async fn crisis_districts(&self, _limit: usize) -> ApiResult<Vec<CrisisDistrict>> {
            Ok(Vec::new())
        }

        async fn filters(&self) -> ApiResult<FilterOptions> {
            Ok(FilterOptions::default())
        }

        async fn ask(&self, _question: &str) -> ApiResult<ChatReply> {
            Ok(ChatReply {
                success: true,
                answer: Some("ok".to_string()),
                chart_data: None,
                error: None,
            })
        }
    }

    fn app(backend: Arc<ToggleBackend>) -> (App, Arc<CountingSurface>) {
        let surface = Arc::new(CountingSurface::default());
        let app = App::new(Config::default(), backend, surface.clone());
        (app, surface)
    }

    #[tokio::test]
    async fn test_healthy_start_reaches_main_view() {
        let backend = Arc::new(ToggleBackend::new(true, true));
        let (mut app, surface) = app(backend);

        app.start().await.unwrap();

        assert_eq!(app.view(), &AppView::Main);
        assert!(app.is_initialized());
        assert!(app.dashboard().unwrap().snapshot().await.failed_panels().is_empty());
        assert_eq!(surface.live(), 2);
    }

    #[tokio::test]
    async fn test_unhealthy_is_fatal() {
        let backend = Arc::new(ToggleBackend::new(false, true));
        let (mut app, surface) = app(backend);

        let err = app.start().await.unwrap_err();
        assert!(matches!(err, BootstrapError::Unhealthy { .. }));
        match app.view() {
            AppView::Fatal { message, backend_url } => {
                assert!(message.contains("degraded"));
                assert_eq!(backend_url, "http://localhost:8000");
            }
            other => panic!("unexpected view: {other:?}"),
        }
        assert!(app.dashboard().is_none());
        assert_eq!(surface.live(), 0);
    }

    #[tokio::test]
    async fn test_retry_rebuilds_session() {
        let backend = Arc::new(ToggleBackend::new(true, false));
        let (mut app, _surface) = app(backend.clone());

        assert!(matches!(
            app.start().await.unwrap_err(),
            BootstrapError::Unreachable(_)
        ));

        backend.reachable.store(true, Ordering::SeqCst);
        app.retry().await.unwrap();

        assert_eq!(app.view(), &AppView::Main);
        assert_eq!(backend.health_checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chat_shortcuts() {
        let backend = Arc::new(ToggleBackend::new(true, true));
        let (mut app, _surface) = app(backend);
        app.start().await.unwrap();
        let chat = app.chat().unwrap();

        assert!(app.handle_key(KeyEvent::ctrl('k')).await);
        assert!(chat.is_open().await);

        assert!(!app.handle_key(KeyEvent::plain(Key::Char('k'))).await);
        assert!(app.handle_key(KeyEvent::plain(Key::Escape)).await);
        assert!(!chat.is_open().await);

        // Escape with the panel closed is not consumed
        assert!(!app.handle_key(KeyEvent::plain(Key::Escape)).await);

        let cmd_k = KeyEvent {
            key: Key::Char('k'),
            ctrl: false,
            meta: true,
        };
        assert!(app.handle_key(cmd_k).await);
        assert!(chat.is_open().await);
    }

    #[tokio::test]
    async fn test_keys_ignored_before_start() {
        let backend = Arc::new(ToggleBackend::new(true, true));
        let (app, _surface) = app(backend);
        assert!(!app.handle_key(KeyEvent::ctrl('k')).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_storm_redraws_once() {
        let backend = Arc::new(ToggleBackend::new(true, true));
        let (mut app, surface) = app(backend);
        app.start().await.unwrap();
        let before = surface.created_for(STATES_PANEL).len();

        for _ in 0..20 {
            app.on_resize();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(surface.created_for(STATES_PANEL).len(), before + 1);
        assert_eq!(surface.created_for(CRISIS_PANEL).len(), 2);
        assert_eq!(surface.live(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_resize_still_ends_clean() {
        let backend = Arc::new(ToggleBackend::new(true, true));
        let (mut app, surface) = app(backend);
        app.start().await.unwrap();
        let before = surface.created_for(STATES_PANEL).len();

        app.on_resize();
        app.shutdown().await;

        assert_eq!(surface.created_for(STATES_PANEL).len(), before + 1);
        assert_eq!(surface.live(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_destroys_all_charts() {
        let backend = Arc::new(ToggleBackend::new(true, true));
        let (mut app, surface) = app(backend);
        app.start().await.unwrap();
        assert_eq!(surface.live(), 2);

        app.shutdown().await;
        assert_eq!(surface.live(), 0);
        assert!(!app.is_initialized());
    }
}
