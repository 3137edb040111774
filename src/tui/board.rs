//! Kanban board for one client.
//!
//! Tasks the acting user can see are laid out in one column per status. Keys run the same
//! `Portal` operations as the CLI, so every move is checked against the workflow and the
//! user's role; refusals show up in the status bar.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::client::Actor;
use crate::db::{format_owner, format_phase, format_role, format_status, format_timestamp, Database};
use crate::error::WorkflowError;
use crate::fields::{Phase, Status};
use crate::notify::TracingNotifier;
use crate::permissions;
use crate::portal::{Portal, TaskFilter};
use crate::repo::ClientRepository;
use crate::task::Task;
use crate::tui::colors::{status_color, text_on};

/// Column order on the board.
pub const BOARD_COLUMNS: [Status; 6] = [
    Status::Pending,
    Status::Resubmit,
    Status::InProgress,
    Status::Completed,
    Status::Submitted,
    Status::Approved,
];

/// A key-triggered operation on the selected card or the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    Start,
    Complete,
    Submit,
    Approve,
    RequestRevision,
    Handoff,
    AdvancePhase,
}

impl BoardAction {
    fn from_key(c: char) -> Option<Self> {
        match c {
            's' => Some(BoardAction::Start),
            'c' => Some(BoardAction::Complete),
            'u' => Some(BoardAction::Submit),
            'a' => Some(BoardAction::Approve),
            'r' => Some(BoardAction::RequestRevision),
            'o' => Some(BoardAction::Handoff),
            'p' => Some(BoardAction::AdvancePhase),
            _ => None,
        }
    }
}

/// Main board application state
pub struct BoardApp {
    db: Database,
    db_path: PathBuf,
    actor: Actor,
    client_id: String,
    notifier: TracingNotifier,
    /// `None` shows every phase.
    phase: Option<Phase>,
    selected_column: usize,
    selected_card: usize,
    list_states: [ListState; 6],
    status_message: String,
    show_task_detail: bool,
    filter_active: bool,
    filter_text: String,
    columns: [Vec<u64>; 6],
}

impl BoardApp {
    pub fn new(db_path: &Path, actor: Actor, client_id: String) -> io::Result<Self> {
        let db = Database::load(db_path).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(Self::with_database(db, db_path, actor, client_id))
    }

    pub fn with_database(db: Database, db_path: &Path, actor: Actor, client_id: String) -> Self {
        let phase = db.client(&client_id).map(|c| c.current_phase);
        let mut app = BoardApp {
            db,
            db_path: db_path.to_path_buf(),
            actor,
            client_id,
            notifier: TracingNotifier,
            phase,
            selected_column: 0,
            selected_card: 0,
            list_states: Default::default(),
            status_message: String::new(),
            show_task_detail: false,
            filter_active: false,
            filter_text: String::new(),
            columns: Default::default(),
        };
        app.update_columns();
        app
    }

    /// Rebuild the columns from the tasks visible to the actor.
    fn update_columns(&mut self) {
        for column in self.columns.iter_mut() {
            column.clear();
        }

        let filter = TaskFilter {
            client: Some(self.client_id.clone()),
            phase: self.phase,
            ..TaskFilter::default()
        };
        let needle = self.filter_text.to_lowercase();
        let mut visible: Vec<&Task> = self
            .db
            .tasks
            .iter()
            .filter(|t| filter.matches(t) && permissions::can_view(&self.actor, t))
            .filter(|t| {
                needle.is_empty()
                    || t.title.to_lowercase().contains(&needle)
                    || t.task_id.to_lowercase().contains(&needle)
            })
            .collect();
        visible.sort_by(|a, b| (a.phase, &a.task_id).cmp(&(b.phase, &b.task_id)));

        for task in visible {
            if let Some(col) = BOARD_COLUMNS.iter().position(|&s| s == task.status) {
                self.columns[col].push(task.id);
            }
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        self.selected_column = self.selected_column.min(BOARD_COLUMNS.len() - 1);
        let last = self.columns[self.selected_column].len().saturating_sub(1);
        self.selected_card = self.selected_card.min(last);
    }

    fn selected_task_id(&self) -> Option<u64> {
        self.columns[self.selected_column].get(self.selected_card).copied()
    }

    /// Pick up writes made by other processes since the board last read the file.
    fn reload(&mut self) -> Result<(), String> {
        let db = Database::load(&self.db_path).map_err(|e| format!("Error loading: {}", e))?;
        self.db = db;
        Ok(())
    }

    /// Reload, run `action` through the portal, persist on success and report the outcome.
    pub fn perform(&mut self, action: BoardAction) {
        let selected = self.selected_task_id();
        if let Err(msg) = self.reload() {
            self.status_message = msg;
            return;
        }
        // The card may have moved column since the last refresh.
        self.update_columns();
        if let Some(id) = selected {
            if !self.select_task(id) && action != BoardAction::AdvancePhase {
                self.status_message = format!("Task #{} is no longer on the board", id);
                return;
            }
        }

        let outcome = self.dispatch(action);
        match outcome {
            Ok(msg) => match self.db.save(&self.db_path) {
                Ok(()) => self.status_message = msg,
                Err(e) => {
                    self.status_message = format!("Error saving: {}", e);
                    if let Err(msg) = self.reload() {
                        self.status_message = msg;
                    }
                }
            },
            Err(e) => self.status_message = format!("Refused: {}", e),
        }
        self.update_columns();
        // Keep the cursor on the card that was just moved.
        if !selected.is_some_and(|id| self.select_task(id)) {
            self.clamp_selection();
        }
    }

    fn select_task(&mut self, id: u64) -> bool {
        for (col, cards) in self.columns.iter().enumerate() {
            if let Some(pos) = cards.iter().position(|&c| c == id) {
                self.selected_column = col;
                self.selected_card = pos;
                return true;
            }
        }
        false
    }

    fn dispatch(&mut self, action: BoardAction) -> Result<String, WorkflowError> {
        let selected = self.selected_task_id();
        let actor = &self.actor;
        let mut portal = Portal::new(&mut self.db, &self.notifier);
        let task_op = |id: Option<u64>| id.ok_or_else(|| WorkflowError::Invalid("no task selected".into()));

        let task = match action {
            BoardAction::AdvancePhase => {
                let (client, created) = portal.advance_phase(&self.client_id, actor)?;
                self.phase = Some(client.current_phase);
                return Ok(format!(
                    "{} advanced to {} ({} new task(s))",
                    client.company,
                    format_phase(client.current_phase),
                    created.len()
                ));
            }
            BoardAction::Start => portal.start_task(task_op(selected)?, actor)?,
            BoardAction::Complete => portal.complete_task(task_op(selected)?, actor)?,
            BoardAction::Submit => portal.submit_task(task_op(selected)?, actor, None)?,
            BoardAction::Approve => portal.approve_task(task_op(selected)?, actor)?,
            BoardAction::RequestRevision => portal.request_revision(task_op(selected)?, actor, None)?,
            BoardAction::Handoff => portal.handoff_to_client(task_op(selected)?, actor)?,
        };
        Ok(format!("{} is now {}", task.task_id, format_status(task.status)))
    }

    fn cycle_phase(&mut self) {
        self.phase = match self.phase {
            None => Some(Phase::ALL[0]),
            Some(p) => p.next(),
        };
        self.selected_column = 0;
        self.selected_card = 0;
        self.update_columns();
        self.status_message = format!(
            "Showing {}",
            self.phase.map(format_phase).unwrap_or("all phases")
        );
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if !event::poll(Duration::from_millis(50))? {
            return Ok(false);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(self.on_key(key)),
            _ => Ok(false),
        }
    }

    /// Apply one key press. Returns `true` when the board should close.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        if self.filter_active {
            self.on_filter_key(key.code);
            return false;
        }
        self.status_message.clear();
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Enter => self.show_task_detail = !self.show_task_detail,
            KeyCode::Left => {
                self.selected_column = self.selected_column.saturating_sub(1);
                self.clamp_selection();
            }
            KeyCode::Right => {
                self.selected_column = (self.selected_column + 1).min(BOARD_COLUMNS.len() - 1);
                self.clamp_selection();
            }
            KeyCode::Up => self.selected_card = self.selected_card.saturating_sub(1),
            KeyCode::Down => {
                self.selected_card += 1;
                self.clamp_selection();
            }
            KeyCode::Char('f') => self.cycle_phase(),
            KeyCode::Char('/') => self.filter_active = true,
            KeyCode::Char('h') => self.status_message = HELP.to_string(),
            KeyCode::Char(c) => {
                if let Some(action) = BoardAction::from_key(c) {
                    self.perform(action);
                }
            }
            _ => {}
        }
        false
    }

    fn on_filter_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.filter_active = false;
                return;
            }
            KeyCode::Esc => {
                self.filter_active = false;
                self.filter_text.clear();
            }
            KeyCode::Backspace => {
                self.filter_text.pop();
            }
            KeyCode::Char(c) => self.filter_text.push(c),
            _ => return,
        }
        self.update_columns();
    }

    fn render(&mut self, f: &mut Frame) {
        let [header, board, status] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)]).areas(f.area());
        f.render_widget(self.header(), header);

        let columns = Layout::horizontal([Constraint::Ratio(1, BOARD_COLUMNS.len() as u32); 6]).split(board);
        for (index, area) in columns.iter().enumerate() {
            self.render_column(f, *area, index);
        }

        let bg = status_color(BOARD_COLUMNS[self.selected_column]);
        f.render_widget(Paragraph::new(self.status_line()).style(Style::default().bg(bg).fg(text_on(bg))), status);

        if self.show_task_detail {
            if let Some(task) = self.selected_task_id().and_then(|id| self.db.get(id)) {
                let area = centered(f.area(), 80, 80);
                f.render_widget(Clear, area);
                f.render_widget(task_detail(task), area);
            }
        }
    }

    fn header(&self) -> Paragraph<'static> {
        let (company, current) = match self.db.client(&self.client_id) {
            Some(c) => (c.company.clone(), format_phase(c.current_phase)),
            None => (self.client_id.clone(), "-"),
        };
        let context = format!(
            "{} | current: {} | showing: {} | as {} ({})",
            company,
            current,
            self.phase.map(format_phase).unwrap_or("all phases"),
            self.actor.name,
            format_role(self.actor.role)
        );
        Paragraph::new(Line::from(vec![
            Span::styled("CLIENT BOARD  ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(context, Style::default().fg(Color::Cyan)),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
    }

    /// One status column as a scrolling list of cards.
    fn render_column(&mut self, f: &mut Frame, area: Rect, index: usize) {
        let status = BOARD_COLUMNS[index];
        let accent = status_color(status);
        let is_selected = index == self.selected_column;
        let border = if is_selected {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", format_status(status), self.columns[index].len()))
            .border_style(border);

        let cards: Vec<ListItem> = self.columns[index].iter().filter_map(|&id| self.db.get(id)).map(card).collect();
        let list = List::new(cards)
            .block(block)
            .highlight_style(Style::default().bg(accent).fg(text_on(accent)).add_modifier(Modifier::BOLD));

        let state = &mut self.list_states[index];
        state.select(is_selected.then_some(self.selected_card));
        f.render_stateful_widget(list, area, state);
    }

    fn status_line(&self) -> String {
        if self.filter_active {
            return format!("Filter: {}_ | Enter to apply, Esc to clear", self.filter_text);
        }
        if !self.status_message.is_empty() {
            return self.status_message.clone();
        }
        let shown: usize = self.columns.iter().map(Vec::len).sum();
        let filter = if self.filter_text.is_empty() {
            String::new()
        } else {
            format!(" matching '{}'", self.filter_text)
        };
        format!("{} task(s){} | h: help", shown, filter)
    }

    /// Draw and handle keys until the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

const HELP: &str = "s start | c complete | u submit | a approve | r revise | o hand off | p advance phase | f phase | / filter | Enter details | q quit";

fn card(task: &Task) -> ListItem<'static> {
    let who = task.assigned_to.clone().unwrap_or_else(|| format_owner(task.owner).to_string());
    ListItem::new(vec![
        Line::from(Span::styled(task.task_id.clone(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(task.title.clone()),
        Line::from(format!("{} | {} | v{}", task.phase.code(), who, task.version)),
        Line::from(""),
    ])
}

fn task_detail(task: &Task) -> Paragraph<'static> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{}: {}", task.task_id, task.title),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Phase:        {}", format_phase(task.phase))),
        Line::from(format!("Status:       {}", format_status(task.status))),
        Line::from(format!("Owner:        {}", format_owner(task.owner))),
        Line::from(format!("Approver:     {}", task.approver.map(format_role).unwrap_or("-"))),
        Line::from(format!("Assigned to:  {}", task.assigned_to.as_deref().unwrap_or("-"))),
        Line::from(format!("Version:      {}", task.version)),
        Line::from(format!("Updated:      {}", format_timestamp(task.updated_at_utc))),
        Line::from(""),
        Line::from(task.description.clone().unwrap_or_else(|| "-".into())),
    ];
    if !task.comments.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Comments", Style::default().add_modifier(Modifier::BOLD))));
        lines.extend(task.comments.iter().map(|c| {
            Line::from(format!("{} ({}): {}", c.user_name, format_role(c.user_role), c.content))
        }));
    }
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Task details (Enter to close)")
                .border_style(Style::default().fg(status_color(task.status))),
        )
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black))
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center).areas(area);
    let [cell] = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center).areas(row);
    cell
}
