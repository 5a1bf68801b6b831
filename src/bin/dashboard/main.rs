mod app;

use std::io;
use std::time::Duration;

use app::{category_label, format_latency, format_money, truncate, AppState, ConnectionStatus};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};

const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
    let Ok(owner_id) = std::env::var("OWNER_ID") else {
        eprintln!("OWNER_ID must be set to the user whose analytics should be shown");
        std::process::exit(1);
    };
    let years = match std::env::var("REPORT_YEARS").map(|v| v.parse::<i32>()) {
        Err(_) => 3,
        Ok(Ok(n)) if (1..=10).contains(&n) => n,
        Ok(_) => {
            eprintln!("REPORT_YEARS must be an integer between 1 and 10");
            std::process::exit(1);
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url, owner_id, years);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = REFRESH_INTERVAL
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Right | KeyCode::Char('l') => app.select_next_year(),
                        KeyCode::Left | KeyCode::Char('h') => app.select_prev_year(),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= REFRESH_INTERVAL {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // header
            Constraint::Length(5),  // headline stats
            Constraint::Min(10),    // body
            Constraint::Length(1),  // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_headline(f, app, chunks[1]);
    render_body(f, app, chunks[2]);
    render_footer(f, chunks[3]);
}

fn bordered(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 50)), Color::Red),
    };

    let source_text = match app.health.source_available {
        Some(true) => Span::styled("source up", Style::default().fg(Color::Green)),
        Some(false) => Span::styled("source down", Style::default().fg(Color::Red)),
        None => Span::styled("source ?", Style::default().fg(Color::DarkGray)),
    };

    let spans = vec![
        Span::styled(
            " Idea Analytics  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("owner {}", truncate(&app.owner_id, 24)),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        source_text,
        Span::raw("  │  "),
        Span::styled(
            format!("p99 {}", format_latency(app.latency.p99_ms)),
            Style::default().fg(Color::White),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_headline(f: &mut Frame, app: &AppState, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let selected = app.selected_report();
    let year_label = selected.map_or("—".to_string(), |r| r.year.to_string());
    let stats = [
        ("Total ideas", app.total_ideas().to_string()),
        ("Total revenue", format_money(app.total_revenue())),
        (
            "Ideas in year",
            selected.map_or("—".to_string(), |r| r.idea_count.to_string()),
        ),
        (
            "Revenue in year",
            selected.map_or("—".to_string(), |r| format_money(r.total_revenue)),
        ),
    ];

    for (i, (label, value)) in stats.into_iter().enumerate() {
        let title = if i >= 2 {
            format!(" {label} ({year_label}) ")
        } else {
            format!(" {label} ")
        };
        let card = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )))
        .block(bordered(&title));
        f.render_widget(card, cards[i]);
    }
}

fn render_body(f: &mut Frame, app: &AppState, area: Rect) {
    // Left: per-year table + categories | right: monthly charts
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(halves[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(halves[1]);

    render_years_table(f, app, left[0]);
    render_categories(f, app, left[1]);
    render_monthly_ideas(f, app, right[0]);
    render_monthly_revenue(f, app, right[1]);
}

fn render_years_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["Year", "Ideas", "Revenue", "Sales"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .reports
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let style = if app.selected == Some(i) {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(r.year.to_string()).style(Style::default().fg(Color::Cyan)),
                Cell::from(r.idea_count.to_string()),
                Cell::from(format_money(r.total_revenue)).style(Style::default().fg(Color::Green)),
                Cell::from(r.sale_count.to_string()),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Min(10),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(bordered(" BY YEAR "));

    f.render_widget(table, area);
}

fn render_categories(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["Category", "Ideas", "Share"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .category_shares()
        .into_iter()
        .map(|share| {
            Row::new(vec![
                Cell::from(truncate(category_label(&share.category), 20)),
                Cell::from(share.count.to_string()),
                Cell::from(format!("{:.1}%", share.percent)).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Min(10), Constraint::Length(7), Constraint::Length(7)],
    )
    .header(header)
    .block(bordered(" CATEGORIES (ALL YEARS) "));

    f.render_widget(table, area);
}

fn render_monthly_ideas(f: &mut Frame, app: &AppState, area: Rect) {
    let bars: Vec<Bar> = app
        .selected_report()
        .map(|r| {
            r.monthly
                .iter()
                .map(|m| {
                    Bar::default()
                        .value(m.idea_count)
                        .label(Line::from(m.label.clone()))
                        .style(Style::default().fg(Color::Cyan))
                })
                .collect()
        })
        .unwrap_or_default();

    let chart = BarChart::default()
        .block(bordered(" IDEAS PER MONTH "))
        .data(BarGroup::default().bars(&bars))
        .bar_width(4)
        .bar_gap(1);
    f.render_widget(chart, area);
}

fn render_monthly_revenue(f: &mut Frame, app: &AppState, area: Rect) {
    let bars: Vec<Bar> = app
        .selected_report()
        .map(|r| {
            r.monthly
                .iter()
                .map(|m| {
                    Bar::default()
                        .value(m.revenue.max(0.0).round() as u64)
                        .text_value(format!("{:.0}", m.revenue))
                        .label(Line::from(m.label.clone()))
                        .style(Style::default().fg(Color::Green))
                })
                .collect()
        })
        .unwrap_or_default();

    let chart = BarChart::default()
        .block(bordered(" REVENUE PER MONTH "))
        .data(BarGroup::default().bars(&bars))
        .bar_width(4)
        .bar_gap(1);
    f.render_widget(chart, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[← → / h l] ", Style::default().fg(Color::Yellow)),
        Span::raw("change year  "),
        Span::styled("auto-refresh: 10s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
