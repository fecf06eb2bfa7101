//! Main rendering logic for TUI.

use std::time::Duration;

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Gauge, Paragraph, Row, Table, Wrap};

use crate::actions::{Dashboard, Histogram, ImageSlot};
use crate::fmt::format_duration;
use crate::poller::{PollerState, Stream};
use crate::stats::EMPTY;

use super::style::Styles;

/// Everything one frame shows.
pub struct View<'a> {
    pub server: &'a str,
    pub poller: &'a PollerState,
    pub dashboard: &'a Dashboard,
    pub tick: Duration,
}

/// Main render function.
pub fn render(frame: &mut Frame, view: &View) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(8),    // Stats | histograms
        Constraint::Length(5), // Streams
        Constraint::Length(1), // Help
    ])
    .split(area);

    render_header(frame, chunks[0], view);

    let body = Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);
    render_stats(frame, body[0], view.dashboard);
    render_histograms(frame, body[1], view.dashboard);

    render_streams(frame, chunks[2], view.poller, view.tick);
    render_help(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, area: Rect, view: &View) {
    let focused = view.poller.is_focused();
    let line = Line::from(vec![
        Span::styled(" ctdash ", Styles::header()),
        Span::styled(format!("{} ", view.server), Styles::header()),
        Span::styled(
            if focused { " FOCUSED " } else { " BACKGROUND " },
            Styles::focus(focused),
        ),
        Span::styled(
            format!(" {}", Local::now().format("%H:%M:%S")),
            Styles::header(),
        ),
    ]);
    frame.render_widget(Paragraph::new(line).style(Styles::header()), area);
}

fn render_stats(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let mut rows: Vec<Row> = dashboard
        .stats
        .rows()
        .iter()
        .map(|(label, value)| {
            Row::new(vec![
                Span::styled(*label, Styles::label()),
                Span::styled(value.to_string(), Styles::value()),
            ])
        })
        .collect();
    if let Some(ref error) = dashboard.stats_error {
        rows.push(Row::new(vec![
            Span::styled("Last error", Styles::error()),
            Span::styled(error.clone(), Styles::error()),
        ]));
    }

    let title = match dashboard.stats.updated_at {
        Some(at) => format!(" Cache stats ({}) ", at.format("%H:%M:%S")),
        None => " Cache stats ".to_string(),
    };
    let table = Table::new(rows, [Constraint::Length(18), Constraint::Min(8)])
        .block(Block::bordered().title(title));
    frame.render_widget(table, area);
}

fn render_histograms(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let chunks =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).split(area);
    for (histogram, chunk) in [Histogram::Hits, Histogram::Days].into_iter().zip(chunks.iter()) {
        render_image_slot(frame, *chunk, histogram, dashboard.slot(histogram));
    }
}

fn render_image_slot(frame: &mut Frame, area: Rect, histogram: Histogram, slot: &ImageSlot) {
    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<10}", label), Styles::label()),
            Span::styled(value, Styles::value()),
        ])
    };

    let mut lines = vec![
        field("source", slot.src.clone().unwrap_or_else(|| EMPTY.to_string())),
        field(
            "size",
            slot.bytes
                .map(|b| format!("{} bytes", b))
                .unwrap_or_else(|| EMPTY.to_string()),
        ),
        field(
            "loaded",
            slot.loaded_at
                .map(|at| at.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| EMPTY.to_string()),
        ),
        field("refreshes", slot.refreshes.to_string()),
    ];
    if let Some(ref error) = slot.error {
        lines.push(Line::from(Span::styled(error.clone(), Styles::error())));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::bordered().title(format!(" {} ", histogram.title())));
    frame.render_widget(paragraph, area);
}

fn render_streams(frame: &mut Frame, area: Rect, poller: &PollerState, tick: Duration) {
    let block = Block::bordered().title(" Refresh streams ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical([Constraint::Length(1); 3]).split(inner);
    for (stream, row) in poller.streams().iter().zip(rows.iter()) {
        let gauge = Gauge::default()
            .gauge_style(Styles::gauge(poller.is_focused()))
            .ratio(progress(stream))
            .label(stream_label(stream, poller.is_focused(), tick));
        frame.render_widget(gauge, *row);
    }
}

/// Fraction of the slow threshold elapsed.
fn progress(stream: &Stream) -> f64 {
    if stream.slow_threshold == 0 {
        return 0.0;
    }
    (stream.counter as f64 / stream.slow_threshold as f64).clamp(0.0, 1.0)
}

fn stream_label(stream: &Stream, focused: bool, tick: Duration) -> String {
    let next = if focused {
        "every tick".to_string()
    } else {
        let remaining = stream.slow_threshold.saturating_sub(stream.counter);
        format!(
            "next in {}",
            format_duration(remaining as f64 * tick.as_secs_f64())
        )
    };
    format!(
        "{:<15} {:>4}/{:<4}  {}  fired {}",
        stream.id.name(),
        stream.counter,
        stream.slow_threshold,
        next,
        stream.fires
    )
}

fn render_help(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" q", Styles::help_key()),
        Span::styled(" quit  ", Styles::help()),
        Span::styled("focus this window for live refresh", Styles::help()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{PollerEvent, StreamId, TICK_PERIOD};
    use crate::stats::StatsResponse;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(view: &View) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(frame, view)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_background_dashboard() {
        let mut poller = PollerState::new();
        for _ in 0..4 {
            poller.apply(PollerEvent::Tick);
        }
        let mut dashboard = Dashboard::default();
        let stats = StatsResponse::from_json(r#"{"total_hit_rate": 0.5, "cached_count": 12}"#)
            .unwrap();
        dashboard.apply_stats(&stats);
        dashboard.hits.src = Some("http://h/image/hits_histogram.svg?1".to_string());

        let screen = draw(&View {
            server: "http://localhost:5000",
            poller: &poller,
            dashboard: &dashboard,
            tick: TICK_PERIOD,
        });

        assert!(screen.contains("BACKGROUND"));
        assert!(screen.contains("50%"));
        assert!(screen.contains("hits_histogram.svg?1"));
        assert!(screen.contains("next in 36 sec"));
    }

    #[test]
    fn test_render_focused_and_error() {
        let mut poller = PollerState::new();
        poller.apply(PollerEvent::FocusGain);
        let mut dashboard = Dashboard::default();
        dashboard.stats_error = Some("Server returned status 502".to_string());

        let screen = draw(&View {
            server: "http://localhost:5000",
            poller: &poller,
            dashboard: &dashboard,
            tick: TICK_PERIOD,
        });

        assert!(screen.contains("FOCUSED"));
        assert!(screen.contains("every tick"));
        assert!(screen.contains("status 502"));
    }

    #[test]
    fn test_stream_label_counts_down() {
        let mut poller = PollerState::new();
        for _ in 0..99 {
            poller.apply(PollerEvent::Tick);
        }
        let label = stream_label(poller.stream(StreamId::HitsHistogram), false, TICK_PERIOD);
        assert!(label.contains("99/100"));
        assert!(label.contains("next in 6 sec"));
        assert!((progress(poller.stream(StreamId::HitsHistogram)) - 0.99).abs() < 1e-9);
    }
}
