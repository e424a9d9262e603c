//! Dashboard View Models
//!
//! Pure data -> view mappings for each panel. UI adapters translate
//! these into whatever they draw with.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::{CrisisDistrict, FilterOptions, MetricsSummary};
use crate::charts::ChartConfig;
use crate::format::{
    display_timestamp, format_large_number, format_number, format_ratio, format_z_score,
};

/// Rows shown in the crisis table
pub const TABLE_ROW_LIMIT: usize = 20;

/// Label of the "no filter" option
pub const ALL_STATES: &str = "All States";

/// Load state of one panel's data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum PanelState<T> {
    Loading,
    Ready(T),
    /// User-facing message for the panel's error banner
    Failed(String),
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        PanelState::Loading
    }
}

impl<T> PanelState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            PanelState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PanelState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PanelState::Failed(_))
    }

    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> PanelState<U> {
        match self {
            PanelState::Loading => PanelState::Loading,
            PanelState::Ready(value) => PanelState::Ready(f(value)),
            PanelState::Failed(msg) => PanelState::Failed(msg.clone()),
        }
    }
}

/// The independently loaded regions of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Panel {
    Metrics,
    States,
    Crisis,
    Filters,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::Metrics, Panel::States, Panel::Crisis, Panel::Filters];

    /// Banner text shown when this panel's load fails
    pub fn error_message(self) -> &'static str {
        match self {
            Panel::Metrics => "Failed to load metrics",
            Panel::States => "Failed to load state data",
            Panel::Crisis => "Failed to load crisis data",
            Panel::Filters => "Failed to load filters",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Panel::Metrics => "metrics",
            Panel::States => "states",
            Panel::Crisis => "crisis",
            Panel::Filters => "filters",
        }
    }
}

/// Card accent color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Accent {
    Blue,
    Yellow,
    Red,
    Green,
    Purple,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardAction {
    Refresh,
}

/// One summary card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub title: &'static str,
    pub value: String,
    pub detail: Option<String>,
    pub accent: Accent,
    pub action: Option<CardAction>,
}

/// Build the six summary cards in display order
pub fn metric_cards(metrics: &MetricsSummary, loaded_at: DateTime<Utc>) -> Vec<MetricCard> {
    vec![
        MetricCard {
            title: "Total Enrollments",
            value: format_large_number(metrics.total_enrollments),
            detail: None,
            accent: Accent::Blue,
            action: None,
        },
        MetricCard {
            title: "Biometric Updates",
            value: format_large_number(metrics.total_bio_updates),
            detail: Some(format!("Ratio: {}", format_ratio(Some(metrics.national_bio_ratio)))),
            accent: Accent::Yellow,
            action: None,
        },
        MetricCard {
            title: "Crisis Districts",
            value: metrics.crisis_districts_count.to_string(),
            detail: Some("Require Urgent Attention".to_string()),
            accent: Accent::Red,
            action: None,
        },
        MetricCard {
            title: "Demographic Updates",
            value: format_large_number(metrics.total_demo_updates),
            detail: Some(format!("Ratio: {}", format_ratio(Some(metrics.national_demo_ratio)))),
            accent: Accent::Green,
            action: None,
        },
        MetricCard {
            title: "Estimated Affected",
            value: "10-15M".to_string(),
            detail: Some("Citizens in crisis zones".to_string()),
            accent: Accent::Purple,
            action: None,
        },
        MetricCard {
            title: "Last Updated",
            value: display_timestamp(loaded_at),
            detail: None,
            accent: Accent::Gray,
            action: Some(CardAction::Refresh),
        },
    ]
}

/// Text tone of a ratio cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RatioTone {
    Danger,
    Warning,
    Primary,
}

impl RatioTone {
    pub fn of_ratio(ratio: f64) -> Self {
        if ratio > 40.0 {
            RatioTone::Danger
        } else if ratio > 30.0 {
            RatioTone::Warning
        } else {
            RatioTone::Primary
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeverityBadge {
    Extreme,
    High,
}

impl SeverityBadge {
    pub fn of_z_score(z: Option<f64>) -> Self {
        if z.is_some_and(|z| z > 3.0) {
            SeverityBadge::Extreme
        } else {
            SeverityBadge::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityBadge::Extreme => "EXTREME",
            SeverityBadge::High => "HIGH",
        }
    }
}

/// One formatted row of the crisis table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisRow {
    pub rank: usize,
    pub state: String,
    pub district: String,
    pub enrollments: String,
    pub bio_updates: String,
    pub ratio: String,
    pub ratio_tone: RatioTone,
    pub z_score: String,
    pub badge: SeverityBadge,
}

/// First 20 districts of a (possibly filtered) view, ranked from 1
pub fn crisis_rows<'a>(districts: impl IntoIterator<Item = &'a CrisisDistrict>) -> Vec<CrisisRow> {
    districts
        .into_iter()
        .take(TABLE_ROW_LIMIT)
        .enumerate()
        .map(|(i, d)| CrisisRow {
            rank: i + 1,
            state: d.state.clone(),
            district: d.district.clone(),
            enrollments: format_number(d.enrollments),
            bio_updates: format_number(d.bio_updates),
            ratio: format_ratio(Some(d.bio_ratio)),
            ratio_tone: RatioTone::of_ratio(d.bio_ratio),
            z_score: format_z_score(d.z_score),
            badge: SeverityBadge::of_z_score(d.z_score),
        })
        .collect()
}

/// Districts belonging to `state`, or all of them when no state is selected
pub fn filter_by_state<'a>(
    districts: &'a [CrisisDistrict],
    state: Option<&str>,
) -> Vec<&'a CrisisDistrict> {
    match state {
        Some(selected) => districts.iter().filter(|d| d.state == selected).collect(),
        None => districts.iter().collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterChoice {
    /// `None` is the "All States" entry
    pub value: Option<String>,
    pub label: String,
}

/// State selector contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterControl {
    pub label: &'static str,
    pub choices: Vec<FilterChoice>,
    pub selected: Option<String>,
}

pub fn filter_control(options: &FilterOptions, selected: Option<&str>) -> FilterControl {
    let mut choices = Vec::with_capacity(options.states.len() + 1);
    choices.push(FilterChoice {
        value: None,
        label: ALL_STATES.to_string(),
    });
    choices.extend(options.states.iter().map(|s| FilterChoice {
        value: Some(s.clone()),
        label: s.clone(),
    }));

    FilterControl {
        label: "Filter by State",
        choices,
        selected: selected.map(str::to_string),
    }
}

/// Everything the adapter needs to draw the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub metrics: PanelState<Vec<MetricCard>>,
    pub states_chart: PanelState<ChartConfig>,
    pub crisis_chart: PanelState<ChartConfig>,
    pub crisis_table: PanelState<Vec<CrisisRow>>,
    pub filters: PanelState<FilterControl>,
    pub selected_state: Option<String>,
}

impl DashboardSnapshot {
    /// Panels currently showing an error banner
    pub fn failed_panels(&self) -> Vec<Panel> {
        let mut failed = Vec::new();
        if self.metrics.is_failed() {
            failed.push(Panel::Metrics);
        }
        if self.states_chart.is_failed() {
            failed.push(Panel::States);
        }
        if self.crisis_chart.is_failed() || self.crisis_table.is_failed() {
            failed.push(Panel::Crisis);
        }
        if self.filters.is_failed() {
            failed.push(Panel::Filters);
        }
        failed
    }
}

/// Pushed to subscribers whenever a panel changes
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    Loading(Panel),
    Metrics(Vec<MetricCard>),
    ChartRendered { panel_id: String },
    CrisisTable(Vec<CrisisRow>),
    Filters(FilterControl),
    PanelError { panel: Panel, message: String },
}
