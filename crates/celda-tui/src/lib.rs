// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The conversation controller and terminal chat view.
//!
//! One turn at a time: submitting input appends the user message and a
//! pending placeholder, spawns the preview pipeline, and resolves the
//! placeholder with the terminal response when the outcome event arrives.
//! The progress-dots ticker is the only other concurrent task; it is gated
//! by a cancellation flag plus request-id matching so a stale tick can
//! never touch a resolved placeholder.

use anyhow::{Context, Result};
use celda_app::{
    GREETING, Intent, MessageBody, MessageId, MessageOrigin, SUGGESTED_PROMPTS, TablePreview,
    Transcript, classify,
};
use celda_ops::Reply;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::{execute, terminal};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::widgets::{Block, Borders, Paragraph};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const MAX_TRANSCRIPT_MESSAGES: usize = 12;
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Bridge between the controller and the host document.
///
/// `spawn_preview`'s default implementation runs the pipeline synchronously
/// on the calling thread and delivers the outcome event; production
/// runtimes override it to run on a worker thread.
pub trait ChatRuntime {
    fn run_preview(&mut self, intent: Intent) -> Result<Reply>;
    fn run_commit(&mut self, intent: Intent) -> Result<String>;

    fn spawn_preview(
        &mut self,
        request_id: u64,
        intent: Intent,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = match self.run_preview(intent) {
            Ok(reply) => PreviewOutcome::Completed(reply),
            Err(error) => PreviewOutcome::Failed(format!("{error:#}")),
        };
        tx.send(InternalEvent::PreviewDone {
            request_id,
            outcome,
        })
        .context("deliver preview outcome")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    Completed(Reply),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    ProgressTick { request_id: u64 },
    PreviewDone { request_id: u64, outcome: PreviewOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub progress_interval: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone)]
struct InFlightTurn {
    request_id: u64,
    placeholder: MessageId,
    frame: usize,
    ticker_cancel: Arc<AtomicBool>,
}

#[derive(Debug)]
struct ViewData {
    transcript: Transcript,
    input: String,
    history: Vec<String>,
    history_cursor: Option<usize>,
    history_buffer: String,
    suggestion_cursor: Option<usize>,
    in_flight: Option<InFlightTurn>,
    status_line: Option<String>,
    status_token: u64,
    next_request_id: u64,
    options: UiOptions,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        Self {
            transcript: Transcript::with_greeting(GREETING),
            input: String::new(),
            history: Vec::new(),
            history_cursor: None,
            history_buffer: String::new(),
            suggestion_cursor: None,
            in_flight: None,
            status_line: None,
            status_token: 0,
            next_request_id: 0,
            options,
        }
    }
}

pub fn run_app<R: ChatRuntime>(runtime: &mut R, options: UiOptions) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(&mut view, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, &view)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(&mut view, runtime, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    cancel_progress_ticker(&mut view);

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view.status_token => {
                view.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::ProgressTick { request_id } => {
                handle_progress_tick(view, request_id);
            }
            InternalEvent::PreviewDone { request_id, outcome } => {
                handle_preview_done(view, tx, request_id, outcome);
            }
        }
    }
}

fn handle_progress_tick(view: &mut ViewData, request_id: u64) {
    let Some((placeholder, frame)) = view.in_flight.as_mut().and_then(|turn| {
        if turn.request_id != request_id {
            return None;
        }
        turn.frame += 1;
        Some((turn.placeholder, turn.frame))
    }) else {
        return;
    };
    view.transcript.animate_placeholder(placeholder, frame);
}

fn handle_preview_done(
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    request_id: u64,
    outcome: PreviewOutcome,
) {
    let matches = view
        .in_flight
        .as_ref()
        .is_some_and(|turn| turn.request_id == request_id);
    if !matches {
        return;
    }
    complete_turn(view, tx, outcome);
}

/// Resolve the current turn: cancel the ticker, remove the placeholder,
/// and append the terminal response.
fn complete_turn(view: &mut ViewData, tx: &Sender<InternalEvent>, outcome: PreviewOutcome) {
    let Some(turn) = view.in_flight.take() else {
        return;
    };
    turn.ticker_cancel.store(true, Ordering::Relaxed);

    let (body, commit) = match outcome {
        PreviewOutcome::Completed(reply) => (reply.body, reply.commit),
        PreviewOutcome::Failed(description) => (
            MessageBody::Text(format!("command failed: {description}")),
            None,
        ),
    };

    if let Err(error) = view
        .transcript
        .resolve_placeholder(turn.placeholder, body, commit)
    {
        emit_status(view, tx, format!("transcript error: {error}"));
    }
}

fn handle_key_event<R: ChatRuntime>(
    view: &mut ViewData,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => return true,
        (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            return true;
        }
        (KeyCode::Char('a'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            apply_latest(view, runtime, tx);
        }
        (KeyCode::Enter, _) => submit_input(view, runtime, tx),
        (KeyCode::Tab, _) => cycle_suggestion(view),
        (KeyCode::Up, _) => history_prev(view),
        (KeyCode::Down, _) => history_next(view),
        (KeyCode::Backspace, _) => {
            view.input.pop();
            view.suggestion_cursor = None;
        }
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            view.input.push(ch);
            view.suggestion_cursor = None;
        }
        _ => {}
    }
    false
}

fn submit_input<R: ChatRuntime>(
    view: &mut ViewData,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
) {
    let input = view.input.trim().to_owned();
    if input.is_empty() {
        return;
    }

    // Busy guard: one pipeline in flight at a time. The rejected input
    // stays in the box so the user can resend it.
    if view.in_flight.is_some() {
        emit_status(view, tx, "still working on the previous command");
        return;
    }

    if view.history.last() != Some(&input) {
        view.history.push(input.clone());
    }
    view.history_cursor = None;
    view.history_buffer.clear();
    view.suggestion_cursor = None;
    view.input.clear();

    view.transcript.push_user(&input);
    let intent = classify(&input);

    let request_id = next_request_id(view);
    let placeholder = match view.transcript.push_placeholder() {
        Ok(placeholder) => placeholder,
        Err(error) => {
            emit_status(view, tx, format!("transcript error: {error}"));
            return;
        }
    };

    let ticker_cancel =
        spawn_progress_ticker(tx.clone(), request_id, view.options.progress_interval);
    view.in_flight = Some(InFlightTurn {
        request_id,
        placeholder,
        frame: 0,
        ticker_cancel,
    });

    if let Err(error) = runtime.spawn_preview(request_id, intent, tx.clone()) {
        complete_turn(view, tx, PreviewOutcome::Failed(format!("{error:#}")));
    }
}

/// Apply the newest committable result to the live document. Runs outside
/// the turn state machine but still honors the single-pipeline invariant.
fn apply_latest<R: ChatRuntime>(
    view: &mut ViewData,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
) {
    if view.in_flight.is_some() {
        emit_status(view, tx, "wait for the running command before applying");
        return;
    }
    let Some((_, intent)) = view.transcript.latest_committable() else {
        emit_status(view, tx, "nothing to apply yet");
        return;
    };

    match runtime.run_commit(intent) {
        Ok(confirmation) => {
            view.transcript.push_assistant_text(confirmation);
            emit_status(view, tx, "applied to the live sheet");
        }
        Err(error) => {
            view.transcript
                .push_assistant_text(format!("apply failed: {error:#}"));
        }
    }
}

fn cycle_suggestion(view: &mut ViewData) {
    let next = match view.suggestion_cursor {
        None => 0,
        Some(index) => (index + 1) % SUGGESTED_PROMPTS.len(),
    };
    view.suggestion_cursor = Some(next);
    view.input = SUGGESTED_PROMPTS[next].1.to_owned();
}

fn history_prev(view: &mut ViewData) {
    if view.history.is_empty() {
        return;
    }
    match view.history_cursor {
        None => {
            view.history_buffer = view.input.clone();
            view.history_cursor = Some(view.history.len() - 1);
        }
        Some(0) => {}
        Some(index) => view.history_cursor = Some(index - 1),
    }
    if let Some(index) = view.history_cursor {
        view.input = view.history[index].clone();
    }
}

fn history_next(view: &mut ViewData) {
    match view.history_cursor {
        None => {}
        Some(index) if index + 1 < view.history.len() => {
            view.history_cursor = Some(index + 1);
            view.input = view.history[index + 1].clone();
        }
        Some(_) => {
            view.history_cursor = None;
            view.input = std::mem::take(&mut view.history_buffer);
        }
    }
}

fn next_request_id(view: &mut ViewData) -> u64 {
    view.next_request_id = view.next_request_id.saturating_add(1);
    if view.next_request_id == 0 {
        view.next_request_id = 1;
    }
    view.next_request_id
}

fn spawn_progress_ticker(
    tx: Sender<InternalEvent>,
    request_id: u64,
    interval: Duration,
) -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    thread::spawn(move || {
        while !flag.load(Ordering::Relaxed) {
            thread::sleep(interval);
            if flag.load(Ordering::Relaxed) {
                break;
            }
            if tx.send(InternalEvent::ProgressTick { request_id }).is_err() {
                break;
            }
        }
    });
    cancel
}

fn cancel_progress_ticker(view: &mut ViewData) {
    if let Some(turn) = view.in_flight.take() {
        turn.ticker_cancel.store(true, Ordering::Relaxed);
    }
}

fn emit_status(view: &mut ViewData, tx: &Sender<InternalEvent>, message: impl Into<String>) {
    view.status_line = Some(message.into());
    view.status_token = view.status_token.wrapping_add(1);
    schedule_status_clear(tx, view.status_token);
}

fn schedule_status_clear(tx: &Sender<InternalEvent>, token: u64) {
    let sender = tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn render(frame: &mut Frame, view: &ViewData) {
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let transcript = Paragraph::new(render_transcript_text(view))
        .block(Block::default().borders(Borders::ALL).title("celda"));
    frame.render_widget(transcript, areas[0]);

    let input = Paragraph::new(format!("> {}", view.input))
        .block(Block::default().borders(Borders::ALL).title("command"));
    frame.render_widget(input, areas[1]);

    frame.render_widget(Paragraph::new(render_footer_text(view)), areas[2]);
}

fn render_transcript_text(view: &ViewData) -> String {
    let messages = view.transcript.messages();
    let committable = view.transcript.latest_committable().map(|(id, _)| id);
    let keep = messages.len().saturating_sub(MAX_TRANSCRIPT_MESSAGES);

    let mut lines = Vec::new();
    for message in messages.iter().skip(keep) {
        let label = match message.origin {
            MessageOrigin::User => "you",
            MessageOrigin::Assistant => "celda",
        };
        match &message.body {
            MessageBody::Text(text) => lines.push(format!("{label}: {text}")),
            MessageBody::Table(preview) => {
                lines.push(format!("{label}:"));
                for line in render_table_lines(preview) {
                    lines.push(format!("  {line}"));
                }
            }
            MessageBody::Image(chart) => lines.push(format!(
                "{label}: [scatter chart png, {} bytes]",
                chart.image_byte_len()
            )),
        }
        if committable == Some(message.id) {
            lines.push("  (ctrl+a applies this to the live sheet)".to_owned());
        }
    }
    lines.join("\n")
}

fn render_table_lines(preview: &TablePreview) -> Vec<String> {
    let column_count = preview
        .rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or_default();
    if column_count == 0 {
        return vec!["(empty table)".to_owned()];
    }

    let mut widths = vec![0usize; column_count];
    for row in &preview.rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let render_row = |row: &Vec<String>| {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(index, &width)| {
                let cell = row.get(index).map(String::as_str).unwrap_or_default();
                format!("{cell:<width$}")
            })
            .collect();
        cells.join(" | ").trim_end().to_owned()
    };

    let mut lines = Vec::with_capacity(preview.rows.len() + 1);
    for (index, row) in preview.rows.iter().enumerate() {
        lines.push(render_row(row));
        if index == 0 {
            let divider: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
            lines.push(divider.join("-+-"));
        }
    }
    lines
}

fn render_footer_text(view: &ViewData) -> String {
    if let Some(status) = &view.status_line {
        return status.clone();
    }
    if view.in_flight.is_some() {
        "working... | esc quit".to_owned()
    } else {
        "enter send | tab suggested prompt | up/down history | ctrl+a apply | esc quit".to_owned()
    }
}
