use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

use crate::app::{App, AuthView, EditState, Session};
use crate::auth::{AuthField, AuthForm};
use crate::location::Location;
use crate::models::{format_due_date, Task, TaskId};
use crate::session::SessionStore;

const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    DraftText,
    DraftDate,
    DraftTime,
    List,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::DraftText => Focus::DraftDate,
            Focus::DraftDate => Focus::DraftTime,
            Focus::DraftTime => Focus::List,
            Focus::List => Focus::DraftText,
        }
    }

    fn previous(self) -> Self {
        match self {
            Focus::DraftText => Focus::List,
            Focus::DraftDate => Focus::DraftText,
            Focus::DraftTime => Focus::DraftDate,
            Focus::List => Focus::DraftTime,
        }
    }
}

/// Terminal-side state wrapped around the controller: focus, selection,
/// the auth form and the screen rows each task occupies.
pub struct View<S: SessionStore> {
    pub app: App<S>,
    pub date_format: String,
    pub focus: Focus,
    pub list_state: ListState,
    pub auth_form: AuthForm,
    pub should_quit: bool,
    // (first row, end row, task index) of every visible task
    task_rows: Vec<(u16, u16, usize)>,
    last_click: Option<(Instant, usize)>,
}

impl<S: SessionStore> View<S> {
    pub fn new(app: App<S>, date_format: impl Into<String>) -> Self {
        View {
            app,
            date_format: date_format.into(),
            focus: Focus::DraftText,
            list_state: ListState::default(),
            auth_form: AuthForm::default(),
            should_quit: false,
            task_rows: Vec::new(),
            last_click: None,
        }
    }

    fn is_editing(&self) -> bool {
        self.app
            .board()
            .is_some_and(|b| matches!(b.edit, EditState::Editing { .. }))
    }

    fn selected_id(&self) -> Option<TaskId> {
        let board = self.app.board()?;
        let i = self.list_state.selected()?;
        board.tasks.get(i).map(|t| t.id.clone())
    }

    /// Keeps the selection inside the current list.
    pub fn sync_selection(&mut self) {
        let len = self.app.board().map_or(0, |b| b.tasks.len());
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            _ => {}
        }
    }

    pub fn next_item(&mut self) {
        let len = self.app.board().map_or(0, |b| b.tasks.len());
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous_item(&mut self) {
        let len = self.app.board().map_or(0, |b| b.tasks.len());
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        if !self.app.is_authenticated() {
            return self.handle_auth_key(key);
        }
        if self.focus == Focus::List && self.is_editing() {
            return self.handle_edit_key(key);
        }
        match self.focus {
            Focus::List => self.handle_list_key(key),
            _ => self.handle_draft_key(key),
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(2) => {
                self.app.switch_auth_view();
                self.auth_form.clear();
            }
            KeyCode::Tab | KeyCode::BackTab => self.auth_form.next_field(),
            KeyCode::Enter => {
                if let Some(credentials) = self.auth_form.credentials() {
                    self.app.submit_auth(credentials);
                }
            }
            KeyCode::Backspace => self.auth_form.backspace(),
            KeyCode::Char(c) => self.auth_form.push(c),
            _ => {}
        }
        Ok(())
    }

    // Leaving the edit field (Esc, Tab, moving the selection) saves it,
    // the same as Enter does.
    fn handle_edit_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.app.save_edit()?,
            KeyCode::Tab => {
                self.app.save_edit()?;
                self.focus = self.focus.next();
            }
            KeyCode::BackTab => {
                self.app.save_edit()?;
                self.focus = self.focus.previous();
            }
            KeyCode::Up => {
                self.app.save_edit()?;
                self.previous_item();
            }
            KeyCode::Down => {
                self.app.save_edit()?;
                self.next_item();
            }
            KeyCode::Backspace => {
                if let Some(scratch) = self.app.scratch_mut() {
                    scratch.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(scratch) = self.app.scratch_mut() {
                    scratch.push(c);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::Char('a') => self.focus = Focus::DraftText,
            KeyCode::Down | KeyCode::Char('j') => self.next_item(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_item(),
            KeyCode::Char(' ') => {
                if let Some(id) = self.selected_id() {
                    self.app.toggle_completed(&id)?;
                }
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(id) = self.selected_id() {
                    self.app.start_edit(&id);
                }
            }
            KeyCode::Delete | KeyCode::Char('d') => {
                if let Some(id) = self.selected_id() {
                    self.app.delete_task(&id)?;
                }
            }
            KeyCode::Char('r') => self.app.fetch_tasks()?,
            KeyCode::Char('L') => {
                self.app.logout()?;
                self.auth_form.clear();
                self.focus = Focus::DraftText;
                self.list_state.select(None);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_draft_key(&mut self, key: KeyEvent) -> Result<()> {
        let focus = self.focus;
        match key.code {
            KeyCode::Enter => self.app.add_task()?,
            KeyCode::Tab => self.focus = focus.next(),
            KeyCode::BackTab => self.focus = focus.previous(),
            KeyCode::Esc => self.focus = Focus::List,
            KeyCode::Backspace => {
                if let Some(field) = self.draft_field_mut(focus) {
                    field.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.draft_field_mut(focus) {
                    field.push(c);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn draft_field_mut(&mut self, focus: Focus) -> Option<&mut String> {
        let draft = &mut self.app.board_mut()?.draft;
        match focus {
            Focus::DraftText => Some(&mut draft.text),
            Focus::DraftDate => Some(&mut draft.due_date),
            Focus::DraftTime => Some(&mut draft.due_time),
            Focus::List => None,
        }
    }

    fn task_at_row(&self, row: u16) -> Option<usize> {
        self.task_rows
            .iter()
            .find(|(start, end, _)| row >= *start && row < *end)
            .map(|(_, _, i)| *i)
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return Ok(());
        }
        self.click_row(mouse.row, Instant::now());
        Ok(())
    }

    /// A second click on the same task within the double-click window
    /// opens it for editing. Single clicks only select, and never while
    /// another task is being edited.
    fn click_row(&mut self, row: u16, at: Instant) {
        let Some(index) = self.task_at_row(row) else {
            self.last_click = None;
            return;
        };

        let double = matches!(
            self.last_click,
            Some((prev, prev_index)) if prev_index == index && at.duration_since(prev) <= DOUBLE_CLICK
        );
        if double {
            self.last_click = None;
            let id = self.app.board().and_then(|b| b.tasks.get(index)).map(|t| t.id.clone());
            if let Some(id) = id {
                self.app.start_edit(&id);
                self.list_state.select(Some(index));
                self.focus = Focus::List;
            }
            return;
        }

        self.last_click = Some((at, index));
        if !self.is_editing() {
            self.list_state.select(Some(index));
            self.focus = Focus::List;
        }
    }
}

pub fn run_tui<S: SessionStore>(mut view: View<S>, mut location: Location) -> Result<()> {
    view.app.bootstrap(&mut location)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut view);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend, S: SessionStore>(
    terminal: &mut Terminal<B>,
    view: &mut View<S>,
) -> Result<()> {
    loop {
        view.app.pump()?;
        view.sync_selection();
        terminal.draw(|f| ui(f, view))?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => view.handle_key(key)?,
                Event::Mouse(mouse) => view.handle_mouse(mouse)?,
                _ => {}
            }
        }

        if view.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui<S: SessionStore>(f: &mut Frame, view: &mut View<S>) {
    let auth_view = match view.app.session() {
        Session::Unauthenticated(auth_view) => Some(*auth_view),
        Session::Authenticated(_) => None,
    };
    match auth_view {
        Some(auth_view) => render_auth(f, view, auth_view),
        None => render_board(f, view),
    }
}

fn render_auth<S: SessionStore>(f: &mut Frame, view: &View<S>, auth_view: AuthView) {
    let (title, other) = match auth_view {
        AuthView::Login => ("Login", "Sign Up"),
        AuthView::Signup => ("Sign Up", "Login"),
    };
    let area = centered_rect(50, 40, f.area());
    let form = &view.auth_form;

    let field_style = |field: AuthField| {
        if form.field == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Email:    ", field_style(AuthField::Email)),
            Span::raw(form.email.clone()),
        ]),
        Line::from(vec![
            Span::styled("Password: ", field_style(AuthField::Password)),
            Span::raw(form.masked_password()),
        ]),
        Line::from(""),
        Line::from(format!("Enter: {}  Tab: next field  F2: {}  Esc: quit", title, other)),
    ];
    if let Some(status) = &view.app.status {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(status.clone(), Style::default().fg(Color::Red))));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

fn render_board<S: SessionStore>(f: &mut Frame, view: &mut View<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled("ToDo List", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("   [Logout: L]", Style::default().fg(Color::Red)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    render_input_row(f, view, chunks[1]);
    render_task_list(f, view, chunks[2]);

    let status = view.app.status.clone().unwrap_or_default();
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Red)),
        chunks[3],
    );

    let hints = match view.focus {
        _ if view.is_editing() && view.focus == Focus::List => {
            "Enter/Esc: Save • Tab/↑/↓: leave field (saves)"
        }
        Focus::List => {
            "↑/↓: Navigate • Space: Toggle • Enter/e: Edit • d: Delete • a: Add • r: Refresh • L: Logout • q: Quit"
        }
        _ => "Enter: Add • Tab: Next field • Esc: Task list • Ctrl+C: Quit",
    };
    f.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        chunks[4],
    );
}

fn render_input_row<S: SessionStore>(f: &mut Frame, view: &View<S>, area: Rect) {
    let Some(board) = view.app.board() else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(18),
            Constraint::Percentage(15),
            Constraint::Percentage(12),
        ])
        .split(area);

    let fields = [
        (Focus::DraftText, &board.draft.text, "Add a new task..."),
        (Focus::DraftDate, &board.draft.due_date, "YYYY-MM-DD"),
        (Focus::DraftTime, &board.draft.due_time, "HH:MM"),
    ];
    for (chunk, (focus, value, placeholder)) in chunks.iter().zip(fields) {
        let focused = view.focus == focus;
        let border = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let content = if value.is_empty() && !focused {
            Span::styled(placeholder, Style::default().fg(Color::DarkGray))
        } else if focused {
            Span::raw(format!("{}▏", value))
        } else {
            Span::raw(value.clone())
        };
        let input = Paragraph::new(Line::from(content))
            .block(Block::default().borders(Borders::ALL).border_style(border));
        f.render_widget(input, *chunk);
    }

    let add = Paragraph::new("Add")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Green));
    f.render_widget(add, chunks[3]);
}

fn render_task_list<S: SessionStore>(f: &mut Frame, view: &mut View<S>, area: Rect) {
    let Some(board) = view.app.board() else {
        return;
    };

    let rendered: Vec<Vec<Line<'static>>> = board
        .tasks
        .iter()
        .map(|task| task_lines(task, &board.edit, &view.date_format))
        .collect();
    let heights: Vec<u16> = rendered.iter().map(|lines| lines.len() as u16).collect();
    let items: Vec<ListItem> = rendered.into_iter().map(ListItem::new).collect();

    let block = Block::default().borders(Borders::ALL).title("Tasks");
    let inner = block.inner(area);
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, &mut view.list_state);

    view.task_rows.clear();
    let mut y = inner.y;
    for (i, height) in heights.iter().enumerate().skip(view.list_state.offset()) {
        if y >= inner.bottom() {
            break;
        }
        let end = (y + height).min(inner.bottom());
        view.task_rows.push((y, end, i));
        y = end;
    }
}

/// Lines for one task row: checkbox, text (or the edit field), the
/// Edit/Save and Delete labels, and a due-info line when any is set.
pub fn task_lines(task: &Task, edit: &EditState, date_format: &str) -> Vec<Line<'static>> {
    let editing = match edit {
        EditState::Editing { id, scratch } if id == &task.id => Some(scratch.clone()),
        _ => None,
    };

    let checkbox = if task.completed { "[x] " } else { "[ ] " };
    let mut spans = vec![Span::raw(checkbox)];

    match &editing {
        Some(scratch) => spans.push(Span::styled(
            format!("{}▏", scratch),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::UNDERLINED),
        )),
        None => {
            let style = if task.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(Color::White)
            };
            spans.push(Span::styled(task.text.clone(), style));
        }
    }

    let button = if editing.is_some() { "  [Save]" } else { "  [Edit]" };
    spans.push(Span::styled(button, Style::default().fg(Color::Cyan)));
    spans.push(Span::styled("  [Delete]", Style::default().fg(Color::Red)));

    let mut lines = vec![Line::from(spans)];
    if editing.is_none() && task.has_due_info() {
        let mut due = Vec::new();
        if let Some(date) = task.due_date.as_deref().filter(|d| !d.is_empty()) {
            due.push(format!("📅 {}", format_due_date(date, date_format)));
        }
        if let Some(time) = task.due_time.as_deref().filter(|t| !t.is_empty()) {
            due.push(format!("🕐 {}", time));
        }
        lines.push(Line::from(Span::styled(
            format!("    {}", due.join("  ")),
            Style::default().fg(Color::Gray),
        )));
    }
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
