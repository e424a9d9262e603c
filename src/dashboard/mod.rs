//! Dashboard Orchestrator
//!
//! Loads the four dashboard datasets, pushes each panel to the chart
//! registry and to view subscribers as soon as its data arrives, and
//! owns the state filter.
//!
//! ## Load isolation
//!
//! Every load handles its own failure: a failed dataset marks only its
//! panel as failed and the other loads still complete and render.

mod view;

pub use view::{
    crisis_rows, filter_by_state, filter_control, metric_cards, Accent, CardAction, CrisisRow,
    DashboardSnapshot, FilterChoice, FilterControl, MetricCard, Panel, PanelState, RatioTone,
    SeverityBadge, ViewUpdate, ALL_STATES, TABLE_ROW_LIMIT,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::api::{Backend, CrisisDistrict, FilterOptions, MetricsSummary, RequestFailed, StateRanking};
use crate::charts::{ChartConfig, SharedCharts, CRISIS_PANEL, STATES_PANEL};
use crate::config::DashboardConfig;

/// Capacity of the view update channel
const UPDATE_CAPACITY: usize = 256;

/// Data held for the page session; replaced wholesale on every refresh
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardData {
    pub metrics: PanelState<MetricsSummary>,
    pub states: PanelState<Vec<StateRanking>>,
    pub crisis: PanelState<Vec<CrisisDistrict>>,
    pub filters: PanelState<FilterOptions>,
    pub selected_state: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Sequences data loads and feeds the renderers
pub struct Dashboard {
    api: Arc<dyn Backend>,
    charts: SharedCharts,
    config: DashboardConfig,
    data: RwLock<DashboardData>,
    updates: broadcast::Sender<ViewUpdate>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn Backend>, charts: SharedCharts, config: DashboardConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);

        Self {
            api,
            charts,
            config,
            data: RwLock::new(DashboardData::default()),
            updates,
        }
    }

    /// Receive panel updates as they happen
    pub fn subscribe(&self) -> broadcast::Receiver<ViewUpdate> {
        self.updates.subscribe()
    }

    /// Load all four datasets, rendering each panel as its data arrives
    pub async fn initialize(&self) {
        tracing::info!("Initializing dashboard...");

        {
            let mut data = self.data.write().await;
            *data = DashboardData::default();
        }
        for panel in Panel::ALL {
            self.publish(ViewUpdate::Loading(panel));
        }

        tokio::join!(
            self.load_metrics(),
            self.load_states(),
            self.load_crisis_districts(),
            self.load_filters(),
        );

        let failed = self.snapshot().await.failed_panels();
        if failed.is_empty() {
            tracing::info!("Dashboard initialized successfully");
        } else {
            tracing::warn!(failed = ?failed, "Dashboard initialized with failed panels");
        }
    }

    /// Re-run the full initialization
    pub async fn refresh(&self) {
        tracing::info!("Refreshing dashboard...");
        self.initialize().await;
    }

    async fn load_metrics(&self) {
        match self.api.metrics().await {
            Ok(metrics) => {
                {
                    let mut data = self.data.write().await;
                    data.metrics = PanelState::Ready(metrics);
                    data.loaded_at = Some(Utc::now());
                }
                self.render_metrics().await;
            }
            Err(e) => self.fail(Panel::Metrics, &e).await,
        }
    }

    async fn load_states(&self) {
        match self.api.states(self.config.states_limit).await {
            Ok(states) => {
                self.data.write().await.states = PanelState::Ready(states);
                self.render_states_chart().await;
            }
            Err(e) => self.fail(Panel::States, &e).await,
        }
    }

    async fn load_crisis_districts(&self) {
        match self.api.crisis_districts(self.config.crisis_limit).await {
            Ok(districts) => {
                self.data.write().await.crisis = PanelState::Ready(districts);
                self.render_crisis().await;
            }
            Err(e) => self.fail(Panel::Crisis, &e).await,
        }
    }

    async fn load_filters(&self) {
        match self.api.filters().await {
            Ok(filters) => {
                self.data.write().await.filters = PanelState::Ready(filters);
                self.render_filters().await;
            }
            Err(e) => self.fail(Panel::Filters, &e).await,
        }
    }

    /// Mark a panel failed, log, and show its banner
    async fn fail(&self, panel: Panel, err: &RequestFailed) {
        tracing::error!(panel = panel.name(), error = %err, "Failed to load {}", panel.name());

        let message = panel.error_message().to_string();
        {
            let mut data = self.data.write().await;
            match panel {
                Panel::Metrics => data.metrics = PanelState::Failed(message.clone()),
                Panel::States => data.states = PanelState::Failed(message.clone()),
                Panel::Crisis => data.crisis = PanelState::Failed(message.clone()),
                Panel::Filters => data.filters = PanelState::Failed(message.clone()),
            }
        }

        if matches!(panel, Panel::States | Panel::Crisis) {
            let panel_id = if panel == Panel::States { STATES_PANEL } else { CRISIS_PANEL };
            self.charts.lock().await.destroy(panel_id);
        }

        self.publish(ViewUpdate::PanelError { panel, message });
    }

    /// Restrict the crisis chart and table to one state, or clear the
    /// restriction with `None`. Works on the loaded data only.
    pub async fn apply_filter(&self, state: Option<String>) {
        let state = state.filter(|s| !s.trim().is_empty());
        tracing::debug!(state = ?state, "Applying state filter");

        let crisis_loaded = {
            let mut data = self.data.write().await;
            data.selected_state = state;
            data.crisis.is_ready()
        };

        if crisis_loaded {
            self.render_crisis().await;
        }
        self.render_filters().await;
    }

    pub async fn selected_state(&self) -> Option<String> {
        self.data.read().await.selected_state.clone()
    }

    /// Current crisis view after filtering
    pub async fn crisis_view(&self) -> Vec<CrisisDistrict> {
        let data = self.data.read().await;
        match data.crisis.ready() {
            Some(all) => filter_by_state(all, data.selected_state.as_deref())
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    async fn render_metrics(&self) {
        let cards = {
            let data = self.data.read().await;
            match data.metrics.ready() {
                Some(metrics) => metric_cards(metrics, data.loaded_at.unwrap_or_else(Utc::now)),
                None => return,
            }
        };
        self.publish(ViewUpdate::Metrics(cards));
    }

    async fn render_states_chart(&self) {
        let config = {
            let data = self.data.read().await;
            match data.states.ready() {
                Some(states) => ChartConfig::state_ranking(states),
                None => return,
            }
        };
        self.render_chart(STATES_PANEL, &config).await;
    }

    /// Crisis chart and table from the current (filtered) view
    async fn render_crisis(&self) {
        let (config, rows) = {
            let data = self.data.read().await;
            let Some(all) = data.crisis.ready() else {
                return;
            };
            let view = filter_by_state(all, data.selected_state.as_deref());
            (ChartConfig::crisis(view.iter().copied()), crisis_rows(view))
        };

        self.render_chart(CRISIS_PANEL, &config).await;
        self.publish(ViewUpdate::CrisisTable(rows));
    }

    async fn render_filters(&self) {
        let control = {
            let data = self.data.read().await;
            match data.filters.ready() {
                Some(options) => filter_control(options, data.selected_state.as_deref()),
                None => return,
            }
        };
        self.publish(ViewUpdate::Filters(control));
    }

    async fn render_chart(&self, panel_id: &str, config: &ChartConfig) {
        let result = self.charts.lock().await.render(panel_id, config);
        match result {
            Ok(()) => self.publish(ViewUpdate::ChartRendered {
                panel_id: panel_id.to_string(),
            }),
            Err(e) => tracing::warn!(panel = %panel_id, error = %e, "Chart not rendered"),
        }
    }

    /// Redraw both chart panels from loaded data, e.g. after a resize
    pub async fn render_charts(&self) {
        self.render_states_chart().await;

        let config = {
            let data = self.data.read().await;
            data.crisis
                .ready()
                .map(|all| ChartConfig::crisis(filter_by_state(all, data.selected_state.as_deref())))
        };
        if let Some(config) = config {
            self.render_chart(CRISIS_PANEL, &config).await;
        }
    }

    /// View models for every panel
    pub async fn snapshot(&self) -> DashboardSnapshot {
        let data = self.data.read().await;
        let loaded_at = data.loaded_at.unwrap_or_else(Utc::now);
        let selected = data.selected_state.as_deref();

        DashboardSnapshot {
            metrics: data.metrics.map(|m| metric_cards(m, loaded_at)),
            states_chart: data.states.map(|s| ChartConfig::state_ranking(s)),
            crisis_chart: data
                .crisis
                .map(|c| ChartConfig::crisis(filter_by_state(c, selected))),
            crisis_table: data.crisis.map(|c| crisis_rows(filter_by_state(c, selected))),
            filters: data.filters.map(|f| filter_control(f, selected)),
            selected_state: data.selected_state.clone(),
        }
    }

    /// Raw loaded data
    pub async fn data(&self) -> DashboardData {
        self.data.read().await.clone()
    }

    /// Loaded data as pretty JSON
    pub async fn export_json(&self) -> Result<String, serde_json::Error> {
        let data = self.data.read().await;
        serde_json::to_string_pretty(&*data)
    }

    fn publish(&self, update: ViewUpdate) {
        // No subscribers is fine; updates are also reflected in snapshots
        let _ = self.updates.send(update);
    }
}
