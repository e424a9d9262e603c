//! Terminal Adapter
//!
//! Draws the view models with ratatui widgets on a crossterm backend.
//! [`TuiChartSurface`] keeps the config of every live chart keyed by
//! panel id; widgets read it back at draw time and destroying a chart
//! removes it.
//!
//! A [`Screen`] is captured from the [`App`] before each frame so the
//! draw itself never waits on a lock.

mod input;
mod widgets;

pub use input::{Command, InputAction, InputLine};
pub use widgets::{
    draw_cards, draw_chart, draw_chat, draw_crisis_table, draw_dashboard, draw_filters,
    draw_screen, transcript_lines, wrapped_height, HELP,
};

use ratatui::{backend::TestBackend, buffer::Buffer, text::Span, Frame, Terminal};
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::app::{App, AppView};
use crate::charts::{ChartConfig, ChartError, ChartHandle, ChartSurface};
use crate::chat::{ChartSlot, ChatMessage, Language, Notice};
use crate::dashboard::DashboardSnapshot;

type Canvas = Arc<Mutex<BTreeMap<String, ChartConfig>>>;

fn lock(canvas: &Canvas) -> MutexGuard<'_, BTreeMap<String, ChartConfig>> {
    canvas.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Chart surface backing the terminal widgets
#[derive(Default, Clone)]
pub struct TuiChartSurface {
    canvas: Canvas,
}

struct TuiChart {
    canvas: Canvas,
    panel_id: String,
}

impl ChartHandle for TuiChart {
    fn destroy(&mut self) {
        lock(&self.canvas).remove(&self.panel_id);
    }
}

impl TuiChartSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config of the live chart in `panel_id`
    pub fn chart(&self, panel_id: &str) -> Option<ChartConfig> {
        lock(&self.canvas).get(panel_id).cloned()
    }

    pub fn live_panels(&self) -> Vec<String> {
        lock(&self.canvas).keys().cloned().collect()
    }
}

impl ChartSurface for TuiChartSurface {
    fn create(
        &self,
        panel_id: &str,
        config: &ChartConfig,
    ) -> Result<Box<dyn ChartHandle>, ChartError> {
        lock(&self.canvas).insert(panel_id.to_string(), config.clone());

        Ok(Box::new(TuiChart {
            canvas: Arc::clone(&self.canvas),
            panel_id: panel_id.to_string(),
        }))
    }
}

/// Open chat panel contents
#[derive(Debug, Clone)]
pub struct ChatPane {
    pub messages: Vec<ChatMessage>,
    pub typing: bool,
    pub language: Language,
}

impl ChatPane {
    /// Slot of the newest message carrying a chart; the pane draws that one
    pub fn latest_chart(&self) -> Option<&ChartSlot> {
        self.messages.iter().rev().find_map(|m| m.chart.as_ref())
    }
}

/// Everything one frame shows
#[derive(Debug, Clone)]
pub struct Screen {
    pub view: AppView,
    pub dashboard: Option<DashboardSnapshot>,
    /// `Some` while the chat panel is open
    pub chat: Option<ChatPane>,
    pub notices: Vec<Notice>,
    pub input: String,
    pub status: Option<String>,
    pub show_help: bool,
}

impl Screen {
    pub fn new(view: AppView) -> Self {
        Self {
            view,
            dashboard: None,
            chat: None,
            notices: Vec::new(),
            input: String::new(),
            status: None,
            show_help: false,
        }
    }

    /// Read the app state the next frame shows
    pub async fn capture(app: &App) -> Self {
        let mut screen = Screen::new(app.view().clone());

        if let Some(dashboard) = app.dashboard() {
            screen.dashboard = Some(dashboard.snapshot().await);
        }
        if let Some(chat) = app.chat() {
            screen.notices = chat.notices().await;
            if chat.is_open().await {
                screen.chat = Some(ChatPane {
                    messages: chat.messages().await,
                    typing: chat.is_typing().await,
                    language: chat.language().await,
                });
            }
        }
        screen
    }

    /// Chat chart slot that is on screen once this frame is drawn
    pub fn mounted_chart(&self) -> Option<&str> {
        self.chat
            .as_ref()?
            .latest_chart()
            .map(|slot| slot.panel_id.as_str())
    }
}

/// Draw one frame offscreen and return its text. Trailing blanks are
/// trimmed from every row.
pub fn render_to_string(width: u16, height: u16, draw: impl FnOnce(&mut Frame)) -> io::Result<String> {
    let mut terminal = Terminal::new(TestBackend::new(width, height))?;
    terminal.draw(draw)?;
    Ok(buffer_text(terminal.backend().buffer()))
}

fn buffer_text(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut row = String::new();
        let mut hidden = 0;
        for x in area.left()..area.right() {
            // Cells covered by a wide glyph carry no text of their own
            if hidden > 0 {
                hidden -= 1;
                continue;
            }
            let symbol = buffer[(x, y)].symbol();
            row.push_str(symbol);
            hidden = Span::raw(symbol).width().saturating_sub(1);
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CrisisDistrict, FilterOptions, MetricsSummary, StateRanking};
    use crate::charts::{ChartRegistry, CRISIS_PANEL, STATES_PANEL};
    use crate::dashboard::{crisis_rows, filter_control, metric_cards, PanelState};
    use chrono::Utc;

    fn states() -> Vec<StateRanking> {
        ["Bihar", "Kerala"]
            .iter()
            .zip([42.0, 10.0])
            .map(|(state, ratio)| StateRanking {
                state: state.to_string(),
                bio_ratio: ratio,
                enrollments: None,
                bio_updates: None,
            })
            .collect()
    }

    fn districts() -> Vec<CrisisDistrict> {
        vec![
            CrisisDistrict {
                state: "Bihar".to_string(),
                district: "Patna".to_string(),
                enrollments: 1200,
                bio_updates: 54000,
                bio_ratio: 45.0,
                z_score: Some(3.5),
            },
            CrisisDistrict {
                state: "Assam".to_string(),
                district: "Dhubri".to_string(),
                enrollments: 900,
                bio_updates: 30000,
                bio_ratio: 33.3,
                z_score: None,
            },
        ]
    }

    fn metrics() -> MetricsSummary {
        MetricsSummary {
            total_enrollments: 25_000_000,
            total_bio_updates: 450_000_000,
            total_demo_updates: 120_000_000,
            national_bio_ratio: 18.0,
            national_demo_ratio: 4.8,
            crisis_districts_count: 2,
        }
    }

    /// Snapshot with every panel ready, charts registered on `surface`
    fn ready_snapshot(surface: &TuiChartSurface) -> DashboardSnapshot {
        let mut registry = ChartRegistry::new(Arc::new(surface.clone()));
        let states_chart = ChartConfig::state_ranking(&states());
        let crisis_chart = ChartConfig::crisis(&districts());
        registry.render(STATES_PANEL, &states_chart).unwrap();
        registry.render(CRISIS_PANEL, &crisis_chart).unwrap();

        let options = FilterOptions {
            states: vec!["Assam".to_string(), "Bihar".to_string()],
        };
        DashboardSnapshot {
            metrics: PanelState::Ready(metric_cards(&metrics(), Utc::now())),
            states_chart: PanelState::Ready(states_chart),
            crisis_chart: PanelState::Ready(crisis_chart),
            crisis_table: PanelState::Ready(crisis_rows(&districts())),
            filters: PanelState::Ready(filter_control(&options, None)),
            selected_state: None,
        }
    }

    fn main_screen(snapshot: DashboardSnapshot) -> Screen {
        let mut screen = Screen::new(AppView::Main);
        screen.dashboard = Some(snapshot);
        screen
    }

    #[test]
    fn test_dashboard_draws_every_panel() {
        let surface = TuiChartSurface::new();
        let screen = main_screen(ready_snapshot(&surface));

        let text = render_to_string(160, 50, |f| draw_screen(f, &screen, &surface)).unwrap();

        assert!(text.contains("Total Enrollments"));
        assert!(text.contains("2.50Cr"));
        assert!(text.contains("State Biometric Ratios"));
        assert!(text.contains("Kerala"));
        assert!(text.contains("Patna, Bihar"));
        assert!(text.contains("Biometric Update Ratio"));
        assert!(text.contains("EXTREME"));
        assert!(text.contains("1,200"));
        assert!(text.contains("All States"));
        assert!(text.contains("Ctrl+K chat"));
    }

    #[test]
    fn test_unscored_district_shows_dash() {
        let surface = TuiChartSurface::new();
        let snapshot = ready_snapshot(&surface);

        let text = render_to_string(120, 10, |f| {
            let rows = snapshot.crisis_table.ready().unwrap();
            draw_crisis_table(f, f.area(), rows)
        })
        .unwrap();

        let dhubri = text.lines().find(|l| l.contains("Dhubri")).unwrap();
        assert!(dhubri.contains(" - "));
        assert!(dhubri.contains("HIGH"));
    }

    #[test]
    fn test_failed_panels_show_their_message() {
        let surface = TuiChartSurface::new();
        let mut snapshot = ready_snapshot(&surface);
        snapshot.crisis_chart = PanelState::Failed("Failed to load crisis data".to_string());
        snapshot.crisis_table = PanelState::Loading;

        let text =
            render_to_string(160, 50, |f| draw_screen(f, &main_screen(snapshot), &surface)).unwrap();

        assert!(text.contains("⚠ Failed to load crisis data"));
        assert!(text.contains("Loading..."));
        assert!(text.contains("Kerala"));
    }

    #[test]
    fn test_fatal_screen() {
        let surface = TuiChartSurface::new();
        let screen = Screen::new(AppView::Fatal {
            message: "Request to /health failed".to_string(),
            backend_url: "http://localhost:8000".to_string(),
        });

        let text = render_to_string(100, 20, |f| draw_screen(f, &screen, &surface)).unwrap();
        assert!(text.contains("Connection Error"));
        assert!(text.contains("http://localhost:8000"));
        assert!(text.contains("retry"));
    }

    #[test]
    fn test_chat_pane_draws_newest_chart() {
        let surface = TuiChartSurface::new();
        let chart = ChartConfig::chat_inline(&serde_json::json!({
            "type": "bar",
            "data": {"labels": ["Punjab"], "datasets": [{"label": "Ratio", "data": [12.5]}]}
        }))
        .unwrap();
        let slot = ChartSlot {
            panel_id: "chat-chart-1".to_string(),
            config: chart.clone(),
        };

        let mut screen = main_screen(ready_snapshot(&surface));
        screen.chat = Some(ChatPane {
            messages: vec![
                ChatMessage::user("Compare Punjab"),
                ChatMessage::assistant("Punjab sits at 12.5").with_chart(slot),
                ChatMessage::error("Failed to get response."),
            ],
            typing: true,
            language: Language::English,
        });
        assert_eq!(screen.mounted_chart(), Some("chat-chart-1"));

        let before = render_to_string(160, 50, |f| draw_screen(f, &screen, &surface)).unwrap();
        assert!(before.contains("Loading chart..."));
        assert!(before.contains("❌ Failed to get response."));
        assert!(before.contains("Assistant is typing..."));
        assert!(before.contains("Which districts need urgent attention?"));

        let mut registry = ChartRegistry::new(Arc::new(surface.clone()));
        registry.render("chat-chart-1", &chart).unwrap();
        let after = render_to_string(160, 50, |f| draw_screen(f, &screen, &surface)).unwrap();
        assert!(!after.contains("Loading chart..."));
        assert!(after.contains("12.50"));
    }

    #[test]
    fn test_closed_chat_mounts_nothing() {
        let screen = Screen::new(AppView::Main);
        assert!(screen.mounted_chart().is_none());
    }

    #[test]
    fn test_surface_destroy_clears_panel() {
        let surface = TuiChartSurface::new();
        let mut registry = ChartRegistry::new(Arc::new(surface.clone()));

        registry
            .render(STATES_PANEL, &ChartConfig::state_ranking(&states()))
            .unwrap();
        assert_eq!(surface.chart(STATES_PANEL).unwrap().labels[0], "Bihar");

        registry.destroy_all();
        assert!(surface.live_panels().is_empty());
    }

    #[test]
    fn test_pie_chart_shares() {
        let labels = vec!["A".to_string(), "B".to_string()];
        let config = ChartConfig::pie(&labels, &[1.0, 3.0], "Split");

        let text = render_to_string(40, 6, |f| {
            draw_chart(f, f.area(), "Chart", Some(&config), "")
        })
        .unwrap();
        assert!(text.contains("Split"));
        assert!(text.contains("B: 3 (75.0%)"));
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![
            ratatui::text::Line::raw("x".repeat(25)),
            ratatui::text::Line::default(),
        ];
        assert_eq!(wrapped_height(&lines, 10), 4);
        assert_eq!(wrapped_height(&lines, 0), 26);
    }

    #[test]
    fn test_help_popup() {
        let surface = TuiChartSurface::new();
        let mut screen = main_screen(ready_snapshot(&surface));
        screen.show_help = true;

        let text = render_to_string(120, 40, |f| draw_screen(f, &screen, &surface)).unwrap();
        assert!(text.contains("Toggle the chat panel"));
    }
}
