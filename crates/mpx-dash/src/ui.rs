use crate::state::App;
use crate::theme::{self, icons};
use mpx_core::format::{
    duration_to_millis, error_rate, human_duration, human_file_size, human_quantity,
    human_throughput, number_with_commas, PLACEHOLDER,
};
use mpx_core::{ServerEntry, Snapshot};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.size();
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, outer[0]);

    let side_open = app.show_help || app.selected().is_some();
    if side_open {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(outer[1]);
        app.update_layout(body[0]);
        render_servers(f, app, body[0]);
        if app.show_help {
            render_help(f, body[1]);
        } else {
            render_details(f, app, body[1]);
        }
    } else {
        app.update_layout(outer[1]);
        render_servers(f, app, outer[1]);
    }

    render_footer(f, app, outer[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut title = vec![Span::styled("moproxy", theme::HEADER_STYLE)];
    if let Some(version) = &app.version {
        title.push(Span::styled(format!(" {version}"), theme::HEADER_STYLE));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (indicator, indicator_color) = if app.is_online() {
        (icons::ONLINE, theme::OK)
    } else {
        (icons::OFFLINE, theme::CRITICAL)
    };
    let mut spans = vec![
        Span::styled(indicator, Style::default().fg(indicator_color)),
        Span::raw(" "),
        Span::styled(app.nav.address().to_string(), Style::default().fg(theme::ACCENT)),
    ];

    if let Some(snapshot) = app.snapshot() {
        spans.push(Span::raw(format!(
            "  up {}  conns {}  {}{} {}{}",
            human_duration(snapshot.uptime),
            number_with_commas(clamp_i64(snapshot.total_alive_connections()), false),
            icons::UP,
            human_throughput(snapshot.throughput.tx_bps),
            icons::DOWN,
            human_throughput(snapshot.throughput.rx_bps),
        )));
    }

    let auto = if !app.poller.auto_refresh() {
        Span::styled("  paused", Style::default().fg(theme::WARN))
    } else if !app.poller.visible() {
        Span::styled("  idle (unfocused)", Style::default().fg(theme::MUTED))
    } else {
        Span::styled("  auto", Style::default().fg(theme::OK))
    };
    spans.push(auto);
    if let Some(since) = app.since_update() {
        spans.push(Span::styled(
            format!("  updated {since}"),
            Style::default().fg(theme::MUTED),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_servers(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Servers");

    let Some(snapshot) = app.snapshot().cloned() else {
        let inner = block.inner(area);
        f.render_widget(block, area);
        let message = match app.last_error() {
            Some(err) => Line::from(Span::styled(err.to_string(), theme::CRITICAL)),
            None => Line::from(Span::styled("Loading status...", theme::MUTED)),
        };
        let text = vec![
            message,
            Line::from(""),
            Line::from(format!("status: {}", app.config.endpoints.status)),
            Line::from("Press r to retry, q to quit."),
        ];
        f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
        return;
    };

    let header = Row::new(vec![
        "Server", "Score", "Delay", "Conns", "Up", "Down", "Throughput",
    ])
    .style(theme::HEADER_STYLE);

    let rows: Vec<Row> = snapshot
        .servers
        .iter()
        .enumerate()
        .map(|(idx, server)| server_row(server).style(theme::zebra_row_style(idx)))
        .collect();

    let widths = [
        Constraint::Min(12),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(11),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(11),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(theme::SELECTED_STYLE);

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn server_row(server: &ServerEntry) -> Row<'static> {
    let status = &server.status;
    let score = status
        .score
        .map(|score| number_with_commas(i64::from(score), false))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let delay = duration_to_millis(status.delay).unwrap_or_else(|| PLACEHOLDER.to_string());
    let conns = format!(
        "{} / {}",
        human_quantity(u64::from(status.conn_alive)),
        human_quantity(u64::from(status.conn_total))
    );
    let throughput = match server.throughput.total() {
        0 => String::new(),
        total => human_throughput(total),
    };

    Row::new(vec![
        Cell::from(server.tag.clone()),
        Cell::from(score).style(Style::default().fg(theme::score_color(status.score))),
        Cell::from(delay),
        Cell::from(conns),
        Cell::from(human_file_size(server.traffic.tx_bytes)),
        Cell::from(human_file_size(server.traffic.rx_bytes)),
        Cell::from(throughput),
    ])
}

fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let Some(server) = app.selected() else {
        return;
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Server {}", server.tag))
        .border_style(Style::default().fg(theme::ACCENT));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text = detail_lines(server, app.snapshot().map(|s| s.as_ref()));
    let p = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    f.render_widget(p, inner);
}

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<12}"), Style::default().fg(theme::MUTED)),
        Span::raw(value.into()),
    ])
}

fn detail_lines(server: &ServerEntry, snapshot: Option<&Snapshot>) -> Vec<Line<'static>> {
    let config = &server.config;
    let status = &server.status;
    let capabilities = if config.capabilities.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        config
            .capabilities
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    let score = match status.score {
        Some(score) if score != 0 => number_with_commas(i64::from(score), false),
        _ => PLACEHOLDER.to_string(),
    };

    let mut lines = vec![
        field("Proxy", server.proxy_url()),
        field("Capability", capabilities),
        field("Max wait", human_duration(config.max_wait)),
        field("Test", format!("dns+tcp://{}", config.test_dns)),
        Line::from(""),
        field(
            "Delay",
            duration_to_millis(status.delay).unwrap_or_else(|| PLACEHOLDER.to_string()),
        ),
        field("Score", score),
        field(
            "Base score",
            number_with_commas(i64::from(config.score_base), true),
        ),
        field(
            "Throughput",
            format!(
                "{}{}  {}{}",
                icons::UP,
                human_throughput(server.throughput.tx_bps),
                icons::DOWN,
                human_throughput(server.throughput.rx_bps)
            ),
        ),
        Line::from(""),
        field(
            "Connections",
            format!(
                "{} alive, {} total, {} errors ({})",
                number_with_commas(i64::from(status.conn_alive), false),
                number_with_commas(i64::from(status.conn_total), false),
                number_with_commas(i64::from(status.conn_error), false),
                error_rate(status.conn_error, status.conn_total)
            ),
        ),
    ];

    let history = server.close_history();
    let mut diagram = vec![Span::styled(
        format!("{:<12}", "Closed"),
        Style::default().fg(theme::MUTED),
    )];
    if history.size() == 0 {
        diagram.push(Span::raw(PLACEHOLDER));
    } else {
        for ok in &history.slots {
            diagram.push(Span::styled(
                icons::SLOT,
                Style::default().fg(theme::slot_color(!*ok)),
            ));
        }
        diagram.push(Span::raw(format!(" {} errors", history.summary())));
    }
    lines.push(Line::from(diagram));

    lines.push(field(
        "Traffic",
        format!(
            "{}{} + {}{} = {}",
            icons::UP,
            human_file_size(server.traffic.tx_bytes),
            icons::DOWN,
            human_file_size(server.traffic.rx_bytes),
            human_file_size(server.traffic.total())
        ),
    ));

    if let Some(snapshot) = snapshot {
        if let Some(index) = snapshot.position(&server.tag) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("{} of {}", index + 1, snapshot.servers.len()),
                Style::default().fg(theme::MUTED),
            )));
        }
    }
    lines
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let keys = [
        ("j / Down / l / Right", "Next server"),
        ("k / Up / h / Left", "Previous server"),
        ("Enter", "Select first server"),
        ("Esc", "Clear selection"),
        ("Backspace / [", "Back"),
        ("]", "Forward"),
        ("r", "Refresh now"),
        ("a", "Toggle auto-refresh"),
        ("PgUp / PgDn", "Scroll details"),
        ("?", "Toggle help"),
        ("q", "Quit"),
    ];
    let mut text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    text.extend(keys.iter().map(|(key, label)| {
        Line::from(vec![
            Span::styled(format!("{key:<22}"), Color::Cyan),
            Span::raw(*label),
        ])
    }));

    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner_area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(note) = &app.status_note {
        Line::from(Span::styled(note.clone(), theme::WARN))
    } else if let Some(err) = app.last_error() {
        Line::from(Span::styled(format!("offline: {err}"), theme::CRITICAL))
    } else {
        Line::from(Span::styled(
            "q quit  ? help  r refresh  a auto  [ ] history",
            theme::MUTED,
        ))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpx_core::{ProxyProto, ServerConfig, ServerStatus, Throughput, Traffic};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn entry() -> ServerEntry {
        ServerEntry {
            tag: "squid".to_string(),
            addr: "10.0.0.1:3128".to_string(),
            proto: ProxyProto::Http {
                connect_with_payload: false,
            },
            config: ServerConfig {
                test_dns: "1.1.1.1:53".to_string(),
                max_wait: Duration::from_secs(4),
                capabilities: BTreeSet::from(["fast".to_string()]),
                score_base: -20,
            },
            status: ServerStatus {
                delay: Some(Duration::from_millis(1234)),
                score: Some(105),
                conn_alive: 1,
                conn_total: 4,
                conn_error: 2,
                close_history: 0b101,
            },
            traffic: Traffic {
                tx_bytes: 2048,
                rx_bytes: 0,
            },
            throughput: Throughput::default(),
        }
    }

    fn flatten(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn detail_lines_render_server_fields() {
        let lines = flatten(&detail_lines(&entry(), None));
        let find = |label: &str| {
            lines
                .iter()
                .find(|line| line.starts_with(label))
                .cloned()
                .unwrap_or_default()
        };

        assert!(find("Proxy").ends_with("HTTP://10.0.0.1:3128"));
        assert!(find("Test").ends_with("dns+tcp://1.1.1.1:53"));
        assert!(find("Delay").ends_with("1,234 ms"));
        assert!(find("Score").ends_with(" 105"));
        assert!(find("Base score").ends_with("-20"));
        assert!(find("Connections").contains("(50.0%)"));
        assert!(find("Closed").ends_with("2/3 errors"));
    }

    #[test]
    fn score_is_unsigned_and_zero_is_a_placeholder() {
        let mut server = entry();
        server.config.score_base = 15;
        let lines = flatten(&detail_lines(&server, None));
        assert!(lines.iter().any(|line| line.starts_with("Base score") && line.ends_with("+15")));
        assert!(!lines.iter().any(|line| line.starts_with("Score") && line.contains('+')));

        server.status.score = Some(0);
        let lines = flatten(&detail_lines(&server, None));
        assert!(lines.iter().any(|line| line.starts_with("Score") && line.ends_with(PLACEHOLDER)));
    }

    #[test]
    fn idle_server_shows_placeholders() {
        let mut server = entry();
        server.status.delay = None;
        server.status.score = None;
        server.status.conn_alive = 0;
        server.status.conn_total = 0;
        server.config.capabilities.clear();
        let lines = flatten(&detail_lines(&server, None));

        let closed = lines.iter().find(|line| line.starts_with("Closed"));
        assert_eq!(closed.map(|line| line.trim_end().ends_with(PLACEHOLDER)), Some(true));
        assert!(lines.iter().any(|line| line.starts_with("Delay") && line.ends_with(PLACEHOLDER)));
        assert!(lines.iter().any(|line| line.starts_with("Score") && line.ends_with(PLACEHOLDER)));
        assert!(lines.iter().any(|line| line.starts_with("Connections") && line.contains("(-)")));
    }
}
