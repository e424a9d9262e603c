//! Chart Rendering
//!
//! Charts are described by a [`ChartConfig`] view model built from
//! backend data, then handed to a [`ChartRegistry`] which owns the live
//! chart instance for each panel.
//!
//! ## Kinds
//!
//! - **State ranking**: horizontal bars, top 15, colored by severity
//! - **Crisis**: horizontal bars, top 10, danger color, rich tooltip
//! - **Pie**: labeled proportions with a cycling palette
//! - **Chat inline**: a backend-supplied spec, kept verbatim

mod registry;

pub use registry::{ChartError, ChartHandle, ChartRegistry, ChartSurface, SharedCharts};

#[cfg(test)]
pub(crate) use registry::testing;

use serde::Serialize;
use std::fmt;

use crate::api::{CrisisDistrict, StateRanking};
use crate::format::{format_number, format_z_score};

/// Panel id of the state ranking chart
pub const STATES_PANEL: &str = "statesChart";
/// Panel id of the crisis district chart
pub const CRISIS_PANEL: &str = "crisisChart";

/// Bars shown on the state ranking chart
pub const STATE_CHART_LIMIT: usize = 15;
/// Bars shown on the crisis chart
pub const CRISIS_CHART_LIMIT: usize = 10;

/// An RGBA color, displayed as `rgba(r, g, b, a)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha (borders use alpha 1)
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

pub const PRIMARY: Color = Color::rgba(59, 130, 246, 0.8);
pub const SUCCESS: Color = Color::rgba(16, 185, 129, 0.8);
pub const WARNING: Color = Color::rgba(251, 191, 36, 0.8);
pub const DANGER: Color = Color::rgba(239, 68, 68, 0.8);
pub const PURPLE: Color = Color::rgba(139, 92, 246, 0.8);
pub const GRAY: Color = Color::rgba(107, 114, 128, 0.8);
pub const ORANGE: Color = Color::rgba(255, 152, 0, 0.8);

const PIE_PALETTE: [Color; 5] = [PRIMARY, SUCCESS, WARNING, DANGER, PURPLE];

/// Severity band of a bio ratio, ordered from mildest to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Normal,
    Elevated,
    High,
    Critical,
}

impl Severity {
    /// Thresholds: `> 40` critical, `> 30` high, `> 20` elevated.
    pub fn of_ratio(ratio: f64) -> Self {
        if ratio > 40.0 {
            Severity::Critical
        } else if ratio > 30.0 {
            Severity::High
        } else if ratio > 20.0 {
            Severity::Elevated
        } else {
            Severity::Normal
        }
    }

    pub fn color(self) -> Color {
        match self {
            Severity::Critical => DANGER,
            Severity::High => WARNING,
            Severity::Elevated => ORANGE,
            Severity::Normal => PRIMARY,
        }
    }
}

/// Bar color for a bio ratio
pub fn severity_color(ratio: f64) -> Color {
    Severity::of_ratio(ratio).color()
}

/// Which builder produced a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    StateRanking,
    Crisis,
    Pie,
    ChatInline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegendPosition {
    Hidden,
    Top,
    Bottom,
}

/// One data series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub background: Vec<Color>,
    pub border: Vec<Color>,
}

/// Everything a surface needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    pub kind: ChartKind,
    /// Rendering library chart type, e.g. `bar` or `pie`
    pub chart_type: String,
    pub horizontal: bool,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    /// Tooltip lines per data point
    pub tooltips: Vec<Vec<String>>,
    pub axis_title: Option<String>,
    pub title: Option<String>,
    pub legend: LegendPosition,
    /// Backend spec for chat charts, untouched
    pub spec: Option<serde_json::Value>,
}

impl ChartConfig {
    /// Top 15 states by backend rank, each bar colored by severity
    pub fn state_ranking(data: &[StateRanking]) -> Self {
        let top = &data[..data.len().min(STATE_CHART_LIMIT)];
        let colors: Vec<Color> = top.iter().map(|d| severity_color(d.bio_ratio)).collect();

        Self {
            kind: ChartKind::StateRanking,
            chart_type: "bar".to_string(),
            horizontal: true,
            labels: top.iter().map(|d| d.state.clone()).collect(),
            datasets: vec![Dataset {
                label: "Biometric Ratio".to_string(),
                data: top.iter().map(|d| d.bio_ratio).collect(),
                border: colors.iter().map(|c| c.with_alpha(1.0)).collect(),
                background: colors,
            }],
            tooltips: top
                .iter()
                .map(|d| vec![format!("Ratio: {:.2}x", d.bio_ratio)])
                .collect(),
            axis_title: Some("Biometric Update Ratio".to_string()),
            title: None,
            legend: LegendPosition::Hidden,
            spec: None,
        }
    }

    /// First 10 crisis districts, plotted by z-score
    pub fn crisis<'a>(data: impl IntoIterator<Item = &'a CrisisDistrict>) -> Self {
        let top: Vec<&CrisisDistrict> = data.into_iter().take(CRISIS_CHART_LIMIT).collect();

        Self {
            kind: ChartKind::Crisis,
            chart_type: "bar".to_string(),
            horizontal: true,
            labels: top
                .iter()
                .map(|d| format!("{}, {}", d.district, d.state))
                .collect(),
            datasets: vec![Dataset {
                label: "Z-Score".to_string(),
                data: top.iter().map(|d| d.z_score.unwrap_or(0.0)).collect(),
                background: vec![DANGER; top.len()],
                border: vec![DANGER.with_alpha(1.0); top.len()],
            }],
            tooltips: top
                .iter()
                .map(|d| {
                    vec![
                        format!("Z-Score: {}", format_z_score(d.z_score)),
                        format!("Ratio: {:.2}x", d.bio_ratio),
                        format!("Enrollments: {}", format_number(d.enrollments)),
                    ]
                })
                .collect(),
            axis_title: Some("Standard Deviations (σ)".to_string()),
            title: None,
            legend: LegendPosition::Hidden,
            spec: None,
        }
    }

    /// Pie chart over arbitrary labeled values
    pub fn pie(labels: &[String], values: &[f64], title: &str) -> Self {
        let background: Vec<Color> = (0..values.len())
            .map(|i| PIE_PALETTE[i % PIE_PALETTE.len()])
            .collect();
        let total: f64 = values.iter().sum();

        Self {
            kind: ChartKind::Pie,
            chart_type: "pie".to_string(),
            horizontal: false,
            labels: labels.to_vec(),
            datasets: vec![Dataset {
                label: title.to_string(),
                data: values.to_vec(),
                border: background.clone(),
                background,
            }],
            tooltips: labels
                .iter()
                .zip(values)
                .map(|(label, v)| {
                    let share = if total > 0.0 { v / total * 100.0 } else { 0.0 };
                    vec![format!("{}: {} ({:.1}%)", label, v, share)]
                })
                .collect(),
            axis_title: None,
            title: Some(title.to_string()),
            legend: LegendPosition::Bottom,
            spec: None,
        }
    }

    /// Wrap a backend chart spec.
    ///
    /// The spec must carry a `type`; labels and numeric series are lifted
    /// out of `data` so text surfaces can draw it, everything else stays
    /// in [`ChartConfig::spec`].
    pub fn chat_inline(spec: &serde_json::Value) -> Result<Self, ChartError> {
        let chart_type = spec
            .get("type")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ChartError::InvalidSpec("missing chart type".to_string()))?;

        let data = spec.get("data");
        let labels: Vec<String> = data
            .and_then(|d| d.get("labels"))
            .and_then(|l| l.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|v| match v.as_str() {
                        Some(s) => s.to_string(),
                        None => v.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let datasets: Vec<Dataset> = data
            .and_then(|d| d.get("datasets"))
            .and_then(|d| d.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|ds| {
                        let values: Vec<f64> = ds
                            .get("data")
                            .and_then(|d| d.as_array())
                            .map(|vals| vals.iter().filter_map(|v| v.as_f64()).collect())
                            .unwrap_or_default();
                        Dataset {
                            label: ds
                                .get("label")
                                .and_then(|l| l.as_str())
                                .unwrap_or_default()
                                .to_string(),
                            background: vec![PRIMARY; values.len()],
                            border: vec![PRIMARY.with_alpha(1.0); values.len()],
                            data: values,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let horizontal = spec
            .pointer("/options/indexAxis")
            .and_then(|a| a.as_str())
            == Some("y");

        let title = spec
            .pointer("/options/plugins/title/text")
            .and_then(|t| t.as_str())
            .map(str::to_string);

        Ok(Self {
            kind: ChartKind::ChatInline,
            chart_type: chart_type.to_string(),
            horizontal,
            labels,
            datasets,
            tooltips: Vec::new(),
            axis_title: None,
            title,
            legend: LegendPosition::Top,
            spec: Some(spec.clone()),
        })
    }

    /// Number of points in the first series
    pub fn len(&self) -> usize {
        self.datasets.first().map(|d| d.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(name: &str, ratio: f64) -> StateRanking {
        StateRanking {
            state: name.to_string(),
            bio_ratio: ratio,
            enrollments: None,
            bio_updates: None,
        }
    }

    fn district(name: &str, z: f64) -> CrisisDistrict {
        CrisisDistrict {
            state: "Bihar".to_string(),
            district: name.to_string(),
            enrollments: 12345,
            bio_updates: 600000,
            bio_ratio: 48.6,
            z_score: Some(z),
        }
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(severity_color(40.01), DANGER);
        assert_eq!(severity_color(40.0), WARNING);
        assert_eq!(severity_color(30.5), WARNING);
        assert_eq!(severity_color(30.0), ORANGE);
        assert_eq!(severity_color(20.5), ORANGE);
        assert_eq!(severity_color(20.0), PRIMARY);
        assert_eq!(severity_color(0.0), PRIMARY);
    }

    #[test]
    fn test_severity_is_monotonic() {
        let mut last = Severity::of_ratio(0.0);
        for step in 0..1000 {
            let next = Severity::of_ratio(step as f64 * 0.1);
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn test_color_display() {
        assert_eq!(DANGER.to_string(), "rgba(239, 68, 68, 0.8)");
        assert_eq!(DANGER.with_alpha(1.0).to_string(), "rgba(239, 68, 68, 1)");
    }

    #[test]
    fn test_state_ranking_truncates_to_fifteen() {
        let data: Vec<_> = (0..20).map(|i| state(&format!("S{i}"), 50.0 - i as f64)).collect();
        let chart = ChartConfig::state_ranking(&data);

        assert_eq!(chart.len(), 15);
        assert_eq!(chart.labels[0], "S0");
        assert_eq!(chart.labels[14], "S14");
        assert!(chart.horizontal);
        assert_eq!(chart.datasets[0].background[0], DANGER);
        assert_eq!(chart.datasets[0].border[0], DANGER.with_alpha(1.0));
        assert_eq!(chart.tooltips[0], vec!["Ratio: 50.00x".to_string()]);
    }

    #[test]
    fn test_crisis_chart() {
        let data: Vec<_> = (0..12).map(|i| district(&format!("D{i}"), 4.0)).collect();
        let chart = ChartConfig::crisis(&data);

        assert_eq!(chart.len(), 10);
        assert_eq!(chart.labels[0], "D0, Bihar");
        assert!(chart.datasets[0].background.iter().all(|c| *c == DANGER));
        assert_eq!(
            chart.tooltips[0],
            vec![
                "Z-Score: 4.00σ".to_string(),
                "Ratio: 48.60x".to_string(),
                "Enrollments: 12,345".to_string(),
            ]
        );
    }

    #[test]
    fn test_crisis_chart_unscored_district() {
        let mut unscored = district("Patna", 0.0);
        unscored.z_score = None;
        let chart = ChartConfig::crisis(&[unscored, district("Gaya", 3.2)]);

        assert_eq!(chart.datasets[0].data, vec![0.0, 3.2]);
        assert_eq!(chart.tooltips[0][0], "Z-Score: -");
    }

    #[test]
    fn test_crisis_chart_short_input() {
        let chart = ChartConfig::crisis(&[district("Patna", 3.2)]);
        assert_eq!(chart.len(), 1);
        assert!(ChartConfig::crisis(&Vec::<CrisisDistrict>::new()).is_empty());
    }

    #[test]
    fn test_pie_palette_cycles() {
        let labels: Vec<String> = (0..6).map(|i| format!("L{i}")).collect();
        let chart = ChartConfig::pie(&labels, &[1.0, 1.0, 1.0, 1.0, 1.0, 5.0], "Share");

        assert_eq!(chart.legend, LegendPosition::Bottom);
        assert_eq!(chart.title.as_deref(), Some("Share"));
        assert_eq!(chart.datasets[0].background[5], PRIMARY);
        assert_eq!(chart.tooltips[5], vec!["L5: 5 (50.0%)".to_string()]);
    }

    #[test]
    fn test_chat_inline_requires_type() {
        let err = ChartConfig::chat_inline(&json!({"data": {}})).unwrap_err();
        assert!(matches!(err, ChartError::InvalidSpec(_)));
    }

    #[test]
    fn test_chat_inline_lifts_series() {
        let spec = json!({
            "type": "bar",
            "data": {
                "labels": ["Bihar", "Assam"],
                "datasets": [{"label": "Bio Ratio", "data": [42.5, 31.0]}]
            },
            "options": {"indexAxis": "y"}
        });
        let chart = ChartConfig::chat_inline(&spec).unwrap();

        assert_eq!(chart.kind, ChartKind::ChatInline);
        assert_eq!(chart.chart_type, "bar");
        assert!(chart.horizontal);
        assert_eq!(chart.labels, vec!["Bihar", "Assam"]);
        assert_eq!(chart.datasets[0].data, vec![42.5, 31.0]);
        assert_eq!(chart.spec.as_ref(), Some(&spec));
    }
}
