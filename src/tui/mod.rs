use std::io;
use std::panic;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};

use crate::core::{Finding, LoadedReport};
use crate::query::{self, QueryState, SortDirection, SortField};
use crate::tree;

pub fn run(loaded: LoadedReport, color: bool, page_size: usize, sort_field: SortField) -> Result<()> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering the alternate screen")?;

    let mut tui = Tui {
        terminal: Terminal::new(CrosstermBackend::new(stdout))
            .context("initializing the terminal")?,
    };
    tui.terminal.clear().ok();

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        run_app(&mut tui.terminal, loaded, color, page_size, sort_field)
    }));

    let _ = tui.terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(res) => res,
        Err(_) => Err(anyhow::anyhow!(
            "the TUI panicked (terminal state should be restored)"
        )),
    }
}

struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Main,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Findings = 0,
    AccessMap = 1,
}

impl Tab {
    fn next(self) -> Self {
        match self {
            Tab::Findings => Tab::AccessMap,
            Tab::AccessMap => Tab::Findings,
        }
    }
}

struct App {
    color: bool,
    loaded: LoadedReport,
    state: QueryState,
    screen: Screen,
    tab: Tab,
    filter_input: String,
    filter_mode: bool,
    access_search: String,
    findings_state: ListState,
    access_state: ListState,
    last_total_pages: usize,
}

impl App {
    fn new(loaded: LoadedReport, color: bool, page_size: usize, sort_field: SortField) -> Self {
        let mut findings_state = ListState::default();
        findings_state.select(Some(0));

        let mut access_state = ListState::default();
        access_state.select(Some(0));

        Self {
            color,
            loaded,
            state: QueryState::new(page_size, sort_field),
            screen: Screen::Main,
            tab: Tab::Findings,
            filter_input: String::new(),
            filter_mode: false,
            access_search: String::new(),
            findings_state,
            access_state,
            last_total_pages: 1,
        }
    }

    fn move_list_selection(state: &mut ListState, len: usize, delta: i32) {
        if len == 0 {
            state.select(None);
            return;
        }
        let selected = state.selected().unwrap_or(0) as i32;
        let next = (selected + delta).clamp(0, (len as i32).saturating_sub(1));
        state.select(Some(next as usize));
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    loaded: LoadedReport,
    color: bool,
    page_size: usize,
    sort_field: SortField,
) -> Result<()> {
    let mut app = App::new(loaded, color, page_size, sort_field);

    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if handle_key(&mut app, key) {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if app.screen == Screen::Help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            app.screen = Screen::Main;
        }
        return false;
    }

    if app.filter_mode {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                app.filter_mode = false;
                app.filter_input = app.filter_input.trim().to_string();
                apply_filter(app);
            }
            KeyCode::Backspace => {
                filter_buffer(app).pop();
                apply_filter(app);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                filter_buffer(app).clear();
                apply_filter(app);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                filter_buffer(app).push(c);
                apply_filter(app);
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => app.screen = Screen::Help,
        KeyCode::Tab | KeyCode::BackTab => app.tab = app.tab.next(),
        KeyCode::Char('/') => app.filter_mode = true,
        KeyCode::Char('v') if app.tab == Tab::Findings => {
            let next = app.state.validation_filter.next();
            app.state.set_validation_filter(next);
        }
        KeyCode::Char('s') if app.tab == Tab::Findings => {
            let next = app.state.sort_field.next();
            app.state.set_sort(next);
        }
        KeyCode::Char('o') if app.tab == Tab::Findings => {
            app.state.set_sort(app.state.sort_field);
        }
        KeyCode::Char('R') => {
            app.state.reset();
            app.filter_input.clear();
            app.access_search.clear();
        }
        KeyCode::Left | KeyCode::Char('h') if app.tab == Tab::Findings => {
            app.state.prev_page();
        }
        KeyCode::Right | KeyCode::Char('l') if app.tab == Tab::Findings => {
            let total = app.last_total_pages;
            app.state.next_page(total);
        }
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_selection(app, 1),
        _ => {}
    }
    false
}

fn filter_buffer(app: &mut App) -> &mut String {
    match app.tab {
        Tab::Findings => &mut app.filter_input,
        Tab::AccessMap => &mut app.access_search,
    }
}

fn apply_filter(app: &mut App) {
    if app.tab == Tab::Findings {
        let input = app.filter_input.clone();
        app.state.set_text_filter(&input);
    }
}

fn move_selection(app: &mut App, delta: i32) {
    match app.tab {
        Tab::Findings => {
            let mut state = app.state.clone();
            let view = query::evaluate(&app.loaded.report.findings, &mut state);
            let len = view.page_rows().len();
            App::move_list_selection(&mut app.findings_state, len, delta);
        }
        Tab::AccessMap => {
            let len = access_lines(app).len();
            App::move_list_selection(&mut app.access_state, len, delta);
        }
    }
}

fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(f, chunks[0], app);

    match app.screen {
        Screen::Help => draw_help(f, chunks[1]),
        Screen::Main => match app.tab {
            Tab::Findings => draw_findings(f, chunks[1], app),
            Tab::AccessMap => draw_access(f, chunks[1], app),
        },
    }

    draw_footer(f, chunks[2], app);
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let tab_titles = ["Findings", "Access Map"];
    let tabs = Tabs::new(tab_titles)
        .select(app.tab as usize)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("scanview — {}", app.loaded.report.source)),
        );
    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let text = if app.filter_mode {
        let buffer = match app.tab {
            Tab::Findings => &app.filter_input,
            Tab::AccessMap => &app.access_search,
        };
        format!("filter: {buffer}█  (Enter/Esc to close, Ctrl+U to clear)")
    } else {
        match app.tab {
            Tab::Findings => {
                "q quit  ? help  Tab switch  / filter  v validation  s sort  o direction  ←/→ page  ↑/↓ select".to_string()
            }
            Tab::AccessMap => {
                "q quit  ? help  Tab switch  / search  ↑/↓ scroll".to_string()
            }
        }
    };
    let w = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    f.render_widget(w, area);
}

fn draw_findings(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(area);

    let view = query::evaluate(&app.loaded.report.findings, &mut app.state);
    app.last_total_pages = view.total_pages;

    let rows = view.page_rows();
    App::move_list_selection(&mut app.findings_state, rows.len(), 0);

    let items: Vec<ListItem> = if rows.is_empty() {
        if app.state.text_filter.is_empty()
            && app.state.validation_filter == crate::query::ValidationFilter::All
        {
            vec![ListItem::new(Line::from("No findings in this report."))]
        } else {
            vec![
                ListItem::new(Line::from("No findings match the current filters.")),
                ListItem::new(Line::from(Span::styled(
                    "Hint: '/' edits the filter, 'v' cycles the validation filter.",
                    Style::default().fg(Color::DarkGray),
                ))),
            ]
        }
    } else {
        rows.iter()
            .map(|finding| {
                let line = Line::from(vec![
                    Span::styled(
                        format!("{:<24}", crate::ui::truncate_middle(&finding.rule_id, 24)),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(" "),
                    Span::styled(
                        format!("{:<10}", crate::ui::truncate_middle(&finding.severity, 10)),
                        Style::default(),
                    ),
                    Span::raw(" "),
                    Span::styled(
                        finding.validation_status.clone(),
                        validation_style(&finding.validation_status, app.color),
                    ),
                ]);
                ListItem::new(line)
            })
            .collect()
    };

    let title = format!(
        "Findings ({matching}/{total})  page {page}/{pages}  sort: {field} {dir}  validation: {validation}",
        matching = view.filtered_count(),
        total = app.loaded.report.findings.len(),
        page = view.current_page,
        pages = view.total_pages,
        field = app.state.sort_field.label(),
        dir = match app.state.sort_direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        },
        validation = app.state.validation_filter.label(),
    );
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, halves[0], &mut app.findings_state);

    let detail = app
        .findings_state
        .selected()
        .and_then(|sel| rows.get(sel))
        .map(|finding| finding_detail(finding, app.color))
        .unwrap_or_else(|| Text::from("No finding selected."));

    let w = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Detail"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, halves[1]);
}

fn finding_detail(finding: &Finding, color: bool) -> Text<'static> {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::<Line>::new();

    lines.push(Line::from(vec![
        Span::styled("rule: ", label),
        Span::raw(finding.rule_id.clone()),
        Span::raw("  "),
        Span::raw(finding.rule_name.clone()),
    ]));
    lines.push(Line::from(vec![
        Span::styled("type: ", label),
        Span::raw(finding.finding_type.clone()),
        Span::raw("  "),
        Span::styled("severity: ", label),
        Span::raw(finding.severity.clone()),
    ]));
    lines.push(Line::from(vec![
        Span::styled("location: ", label),
        Span::raw(if finding.line.is_empty() {
            finding.path.clone()
        } else {
            format!("{}:{}", finding.path, finding.line)
        }),
    ]));
    lines.push(Line::from(vec![
        Span::styled("validation: ", label),
        Span::styled(
            finding.validation_status.clone(),
            validation_style(&finding.validation_status, color),
        ),
        Span::raw("  "),
        Span::styled("confidence: ", label),
        Span::raw(finding.validation_confidence.clone()),
    ]));
    if !finding.validation_response.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("response: ", label),
            Span::raw(crate::ui::truncate_middle(&finding.validation_response, 200)),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("confidence: ", label),
        Span::raw(finding.confidence.clone()),
        Span::raw("  "),
        Span::styled("fingerprint: ", label),
        Span::raw(finding.fingerprint.clone()),
    ]));

    if !finding.message.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(finding.message.clone()));
    }

    if !finding.snippet.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "snippet:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(finding.snippet.clone()));
    }

    Text::from(lines)
}

fn draw_access(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let lines = access_lines(app);
    App::move_list_selection(&mut app.access_state, lines.len(), 0);

    let row_count = app.loaded.report.access_map.len();
    let title = if app.access_search.trim().is_empty() {
        format!("Access Map ({row_count} rows)")
    } else {
        format!(
            "Access Map ({row_count} rows, search: {})",
            app.access_search.trim()
        )
    };

    let items: Vec<ListItem> = if lines.is_empty() {
        if app.access_search.trim().is_empty() {
            vec![ListItem::new(Line::from(
                "No access-map entries in this report.",
            ))]
        } else {
            vec![ListItem::new(Line::from(
                "No access-map rows match the search term.",
            ))]
        }
    } else {
        lines.into_iter().map(ListItem::new).collect()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.access_state);
}

fn access_lines(app: &App) -> Vec<Line<'static>> {
    let Some(tree) = tree::build(&app.loaded.report.access_map, &app.access_search) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for provider in &tree.providers {
        lines.push(Line::from(Span::styled(
            provider.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for account in &provider.accounts {
            lines.push(Line::from(format!("  {}", account.name)));
            for row in &account.rows {
                let resource = if row.resource.is_empty() {
                    "-".to_string()
                } else {
                    row.resource.clone()
                };
                let text = if row.permissions.is_empty() {
                    format!("    {resource}")
                } else {
                    format!("    {resource} [{}]", row.permissions.join(", "))
                };
                lines.push(Line::from(text));
            }
        }
    }
    lines
}

fn draw_help(f: &mut ratatui::Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from("Keys:"),
        Line::from(""),
        Line::from("  q          quit"),
        Line::from("  Tab        switch between Findings and Access Map"),
        Line::from("  /          edit the free-text filter (Findings) or search (Access Map)"),
        Line::from("  v          cycle the validation filter (all/active/inactive/not_attempted)"),
        Line::from("  s          cycle the sort field"),
        Line::from("  o          flip the sort direction"),
        Line::from("  ←/→, h/l   previous/next page"),
        Line::from("  ↑/↓, k/j   move the selection"),
        Line::from("  R          reset filters, sort and page"),
        Line::from("  ?          toggle this help"),
        Line::from(""),
        Line::from("Exports are CLI subcommands: `scanview export csv|json|access <REPORT>`."),
    ]);
    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, area);
}

fn validation_style(status: &str, color: bool) -> Style {
    if !color {
        return Style::default();
    }
    match status.to_ascii_lowercase().as_str() {
        "active credential" => Style::default().fg(Color::Red),
        "inactive credential" => Style::default().fg(Color::Green),
        "not attempted" => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::DarkGray),
    }
}
