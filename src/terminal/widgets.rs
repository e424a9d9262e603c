//! Frame drawing for the dashboard, the chat panel and the full-screen
//! loading and error views.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::{ChatPane, Screen, TuiChartSurface};
use crate::app::AppView;
use crate::charts::{self, ChartConfig, Dataset, CRISIS_PANEL, STATES_PANEL};
use crate::chat::{ChatMessage, NoticeLevel, Role, QUICK_QUESTIONS};
use crate::dashboard::{
    Accent, CrisisRow, DashboardSnapshot, FilterControl, MetricCard, PanelState, RatioTone,
    SeverityBadge,
};
use crate::format::{display_timestamp, truncate_text};

pub const HELP: &str = "\
Keys
  Ctrl+K / Cmd+K     Toggle the chat panel
  Esc                Close the chat panel, clear the input
  Ctrl+R             Reload every panel
  Ctrl+C             Exit

Commands (prefix with / while the chat is open)
  filter <state>     Crisis districts for one state
  filter             All states
  ask <question>     Ask the assistant
  quick <1-4>        Ask a quick question
  lang <en|hi|te>    Reply language
  clear              Clear chat history
  export <path>      Write loaded data as JSON
  retry              Retry the connection
  quit               Exit";

const HINT: &str = "Ctrl+K chat | Esc close | Ctrl+R refresh | Ctrl+C quit | help";

const STATES_TITLE: &str = "State Biometric Ratios (Top 15)";
const CRISIS_TITLE: &str = "Crisis Districts (Top 10 by Z-Score)";

/// Longest bar label before truncation
const LABEL_WIDTH: usize = 24;
const CHAT_CHART_HEIGHT: u16 = 10;

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn term_color(color: charts::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn accent_color(accent: Accent) -> Color {
    term_color(match accent {
        Accent::Blue => charts::PRIMARY,
        Accent::Yellow => charts::WARNING,
        Accent::Red => charts::DANGER,
        Accent::Green => charts::SUCCESS,
        Accent::Purple => charts::PURPLE,
        Accent::Gray => charts::GRAY,
    })
}

fn titled(title: &str) -> Block<'static> {
    Block::bordered().title(format!(" {title} "))
}

/// Bar lengths are integers; two decimals survive the scaling
fn bar_value(value: f64) -> u64 {
    (value.max(0.0) * 100.0).round() as u64
}

/// Rows `lines` occupy once wrapped to `width`
pub fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Loading and error states in a titled block; `draw` gets the ready value
fn draw_panel<T>(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    state: &PanelState<T>,
    draw: impl FnOnce(&mut Frame, Rect, &T),
) {
    match state {
        PanelState::Ready(value) => draw(frame, area, value),
        PanelState::Loading => frame.render_widget(
            Paragraph::new("Loading...").style(dim()).block(titled(title)),
            area,
        ),
        PanelState::Failed(message) => frame.render_widget(
            Paragraph::new(format!("⚠ {message}"))
                .style(Style::default().fg(term_color(charts::DANGER)))
                .wrap(Wrap { trim: true })
                .block(titled(title)),
            area,
        ),
    }
}

/// Draw a live chart, or `placeholder` when the panel has none
pub fn draw_chart(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    config: Option<&ChartConfig>,
    placeholder: &str,
) {
    let title = config.and_then(|c| c.title.as_deref()).unwrap_or(title);
    let mut block = titled(title);

    let Some(config) = config else {
        frame.render_widget(Paragraph::new(placeholder.to_string()).style(dim()).block(block), area);
        return;
    };
    if let Some(axis) = &config.axis_title {
        block = block.title_bottom(Line::from(format!(" {axis} ")).right_aligned());
    }
    let Some(series) = config.datasets.first().filter(|s| !s.data.is_empty()) else {
        frame.render_widget(Paragraph::new("No data").style(dim()).block(block), area);
        return;
    };

    match config.chart_type.as_str() {
        "pie" | "doughnut" | "polarArea" => {
            frame.render_widget(share_list(config, series).block(block), area)
        }
        _ => frame.render_widget(bar_chart(config, series).block(block), area),
    }
}

/// Bars are always horizontal; labels do not fit under vertical ones
fn bar_chart<'a>(config: &ChartConfig, series: &Dataset) -> BarChart<'a> {
    let bars: Vec<Bar> = series
        .data
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let color = series
                .background
                .get(i)
                .copied()
                .map(term_color)
                .unwrap_or(Color::Blue);
            let label = config
                .labels
                .get(i)
                .map(|l| truncate_text(l, LABEL_WIDTH))
                .unwrap_or_default();

            Bar::default()
                .label(Line::from(label))
                .value(bar_value(*value))
                .text_value(format!("{value:.2}"))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    BarChart::default()
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars))
}

fn share_list<'a>(config: &ChartConfig, series: &Dataset) -> Paragraph<'a> {
    let total: f64 = series.data.iter().sum();
    let lines: Vec<Line> = series
        .data
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let color = series
                .background
                .get(i)
                .copied()
                .map(term_color)
                .unwrap_or(Color::Blue);
            let label = config.labels.get(i).cloned().unwrap_or_default();
            let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
            Line::from(vec![
                Span::styled("■ ", Style::default().fg(color)),
                Span::raw(format!("{label}: {value} ({share:.1}%)")),
            ])
        })
        .collect();
    Paragraph::new(lines)
}

pub fn draw_cards(frame: &mut Frame, area: Rect, cards: &[MetricCard]) {
    if cards.is_empty() {
        return;
    }
    let count = u32::try_from(cards.len()).unwrap_or(u32::MAX);
    let columns = Layout::horizontal(vec![Constraint::Ratio(1, count); cards.len()]).split(area);

    for (card, column) in cards.iter().zip(columns.iter()) {
        let color = accent_color(card.accent);
        let mut lines = vec![Line::styled(
            card.value.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )];
        if let Some(detail) = &card.detail {
            lines.push(Line::styled(detail.clone(), dim()));
        }
        if card.action.is_some() {
            lines.push(Line::styled("Ctrl+R refresh", dim()));
        }

        let block = titled(card.title).border_style(Style::default().fg(color));
        frame.render_widget(Paragraph::new(lines).block(block), *column);
    }
}

fn tone_color(tone: RatioTone) -> Color {
    term_color(match tone {
        RatioTone::Danger => charts::DANGER,
        RatioTone::Warning => charts::WARNING,
        RatioTone::Primary => charts::PRIMARY,
    })
}

fn badge_style(badge: SeverityBadge) -> Style {
    match badge {
        SeverityBadge::Extreme => Style::default()
            .fg(term_color(charts::DANGER))
            .add_modifier(Modifier::BOLD),
        SeverityBadge::High => Style::default().fg(term_color(charts::WARNING)),
    }
}

pub fn draw_crisis_table(frame: &mut Frame, area: Rect, rows: &[CrisisRow]) {
    let block = titled("Crisis Districts");
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new("No crisis districts for this selection")
                .style(dim())
                .block(block),
            area,
        );
        return;
    }

    let header = Row::new([
        "#", "State", "District", "Enrollments", "Bio Updates", "Ratio", "Z-Score", "Severity",
    ])
    .style(bold());

    let body: Vec<Row> = rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.rank.to_string()),
                Cell::from(row.state.clone()),
                Cell::from(row.district.clone()),
                Cell::from(row.enrollments.clone()),
                Cell::from(row.bio_updates.clone()),
                Cell::from(row.ratio.clone()).style(Style::default().fg(tone_color(row.ratio_tone))),
                Cell::from(row.z_score.clone()),
                Cell::from(row.badge.label()).style(badge_style(row.badge)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(12),
        Constraint::Min(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(9),
    ];
    frame.render_widget(Table::new(body, widths).header(header).block(block), area);
}

pub fn draw_filters(frame: &mut Frame, area: Rect, control: &FilterControl) {
    let spans: Vec<Span> = control
        .choices
        .iter()
        .map(|choice| {
            let style = if choice.value == control.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                dim()
            };
            Span::styled(format!(" {} ", choice.label), style)
        })
        .collect();

    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(titled(control.label)),
        area,
    );
}

/// Cards, both charts, the state filter and the crisis table
pub fn draw_dashboard(
    frame: &mut Frame,
    area: Rect,
    snapshot: &DashboardSnapshot,
    surface: &TuiChartSurface,
) {
    let chunks = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(12),
        Constraint::Length(3),
        Constraint::Min(8),
    ])
    .split(area);

    draw_panel(frame, chunks[0], "Overview", &snapshot.metrics, |f, a, cards| {
        draw_cards(f, a, cards)
    });

    let halves =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).split(chunks[1]);
    draw_panel(frame, halves[0], STATES_TITLE, &snapshot.states_chart, |f, a, _| {
        let live = surface.chart(STATES_PANEL);
        draw_chart(f, a, STATES_TITLE, live.as_ref(), "Chart unavailable")
    });
    draw_panel(frame, halves[1], CRISIS_TITLE, &snapshot.crisis_chart, |f, a, _| {
        let live = surface.chart(CRISIS_PANEL);
        draw_chart(f, a, CRISIS_TITLE, live.as_ref(), "Chart unavailable")
    });

    draw_panel(frame, chunks[2], "Filter by State", &snapshot.filters, |f, a, control| {
        draw_filters(f, a, control)
    });
    draw_panel(frame, chunks[3], "Crisis Districts", &snapshot.crisis_table, |f, a, rows| {
        draw_crisis_table(f, a, rows)
    });
}

/// Transcript text: a header line per message, then its content
pub fn transcript_lines(messages: &[ChatMessage], typing: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for message in messages {
        let (speaker, color) = match message.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("Assistant", Color::Green),
        };
        lines.push(Line::from(vec![
            Span::styled(speaker, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {}", display_timestamp(message.timestamp)), dim()),
        ]));

        let style = if message.is_error {
            Style::default().fg(term_color(charts::DANGER))
        } else {
            Style::default()
        };
        for (i, text) in message.content.lines().enumerate() {
            let marker = if message.is_error && i == 0 { "❌ " } else { "" };
            lines.push(Line::styled(format!("{marker}{text}"), style));
        }
        if message.chart.is_some() {
            lines.push(Line::styled("[chart]", dim()));
        }
        lines.push(Line::default());
    }

    if typing {
        lines.push(Line::styled(
            "Assistant is typing...",
            dim().add_modifier(Modifier::ITALIC),
        ));
    }
    lines
}

/// Transcript, the newest chat chart and the quick questions
pub fn draw_chat(frame: &mut Frame, area: Rect, pane: &ChatPane, surface: &TuiChartSurface) {
    let block = titled(&format!("AI Assistant ({})", pane.language))
        .border_style(Style::default().fg(term_color(charts::PURPLE)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let slot = pane.latest_chart();
    let mut constraints = vec![Constraint::Min(3)];
    if slot.is_some() {
        constraints.push(Constraint::Length(CHAT_CHART_HEIGHT));
    }
    constraints.push(Constraint::Length(QUICK_QUESTIONS.len() as u16 + 1));
    let chunks = Layout::vertical(constraints).split(inner);

    let lines = transcript_lines(&pane.messages, pane.typing);
    let scroll = wrapped_height(&lines, chunks[0].width).saturating_sub(chunks[0].height);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        chunks[0],
    );

    if let Some(slot) = slot {
        let live = surface.chart(&slot.panel_id);
        draw_chart(frame, chunks[1], "Chart", live.as_ref(), "Loading chart...");
    }

    let mut quick = vec![Line::styled("Quick questions (quick <n>)", bold())];
    quick.extend(
        QUICK_QUESTIONS
            .iter()
            .enumerate()
            .map(|(i, q)| Line::styled(format!("{}. {q}", i + 1), dim())),
    );
    frame.render_widget(Paragraph::new(quick), chunks[chunks.len() - 1]);
}

fn draw_loading(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::styled("UIDAI AI Intelligence Platform", bold()),
        Line::styled("Initializing dashboard...", dim()),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        centered(area, area.width, 2),
    );
}

fn draw_fatal(frame: &mut Frame, area: Rect, message: &str, backend_url: &str) {
    let danger = term_color(charts::DANGER);
    let lines = vec![
        Line::styled(format!("Error: {message}"), Style::default().fg(danger)),
        Line::default(),
        Line::raw(format!(
            "Please ensure the backend server is running on {backend_url}"
        )),
        Line::default(),
        Line::styled("Type retry and press Enter to try again.", dim()),
    ];
    let block = titled("⚠ Connection Error").border_style(Style::default().fg(danger));
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(block),
        centered(area, 72, 9),
    );
}

fn draw_status(frame: &mut Frame, area: Rect, screen: &Screen) {
    let line = match (screen.notices.last(), &screen.status) {
        (Some(notice), _) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Cyan,
                NoticeLevel::Success => term_color(charts::SUCCESS),
                NoticeLevel::Warning => term_color(charts::WARNING),
                NoticeLevel::Error => term_color(charts::DANGER),
            };
            Line::styled(notice.text.clone(), Style::default().fg(color))
        }
        (None, Some(status)) => Line::raw(status.clone()),
        (None, None) => Line::styled(HINT, dim()),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_input(frame: &mut Frame, area: Rect, screen: &Screen) {
    let title = if screen.chat.is_some() { "Ask" } else { "Command" };
    let block = titled(title);
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(format!("> {}", screen.input)).block(block), area);

    let typed = u16::try_from(Line::raw(screen.input.as_str()).width()).unwrap_or(u16::MAX);
    let x = inner.x.saturating_add(2).saturating_add(typed);
    if x < inner.right() {
        frame.set_cursor_position((x, inner.y));
    }
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let popup = centered(area, 64, HELP.lines().count() as u16 + 2);
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(HELP).block(titled("Help")), popup);
}

/// The whole terminal: title, current view, status line and input
pub fn draw_screen(frame: &mut Frame, screen: &Screen, surface: &TuiChartSurface) {
    let area = frame.area();
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(Line::styled(" UIDAI AI Intelligence Platform", bold())),
        chunks[0],
    );

    match &screen.view {
        AppView::Loading => draw_loading(frame, chunks[1]),
        AppView::Fatal {
            message,
            backend_url,
        } => draw_fatal(frame, chunks[1], message, backend_url),
        AppView::Main => {
            let body = match &screen.chat {
                Some(pane) => {
                    let columns = Layout::horizontal([
                        Constraint::Percentage(60),
                        Constraint::Percentage(40),
                    ])
                    .split(chunks[1]);
                    draw_chat(frame, columns[1], pane, surface);
                    columns[0]
                }
                None => chunks[1],
            };
            if let Some(snapshot) = &screen.dashboard {
                draw_dashboard(frame, body, snapshot, surface);
            }
        }
    }

    draw_status(frame, chunks[2], screen);
    draw_input(frame, chunks[3], screen);
    if screen.show_help {
        draw_help(frame, area);
    }
}
