use std::collections::HashMap;

use mutiger_weg_core::error::GENERIC_FAILURE_NOTICE;
use mutiger_weg_core::{ConversationController, ConversationSnapshot, ControllerError, FormField, Provider};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;

/// Which widget receives key input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(FormField),
    Submit,
    Transcript,
    FollowUp,
}

/// A text buffer owned by the controller that the UI edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputTarget {
    Form(FormField),
    FollowUp,
}

impl Focus {
    pub fn input_target(&self) -> Option<InputTarget> {
        match self {
            Focus::Field(field) => Some(InputTarget::Form(*field)),
            Focus::FollowUp => Some(InputTarget::FollowUp),
            Focus::Submit | Focus::Transcript => None,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub focus: Focus,
    pub provider: Provider,
    pub controller: ConversationController,

    // Rendered copy of the controller state, refreshed once per frame
    pub snapshot: ConversationSnapshot,

    // Cursor per text buffer, in characters
    pub cursors: HashMap<InputTarget, usize>,

    // Outstanding submit or send operation
    pub task: Option<JoinHandle<Result<(), ControllerError>>>,

    // Blocking notification; swallows keys until dismissed
    pub notice: Option<String>,

    // Transcript scroll state
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_width: u16,
    pub transcript_area: Option<Rect>,
    // Keep the newest message in view across redraws until the user scrolls
    pub pin_transcript: bool,

    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(controller: ConversationController, provider: Provider) -> Self {
        let snapshot = controller.snapshot();
        Self {
            should_quit: false,
            focus: Focus::Field(FormField::Traumjob),
            provider,
            controller,
            snapshot,
            cursors: HashMap::new(),
            task: None,
            notice: None,
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            transcript_area: None,
            pin_transcript: true,
            animation_frame: 0,
        }
    }

    pub fn refresh(&mut self) {
        self.snapshot = self.controller.snapshot();
    }

    /// True from the key press until the spawned operation has been collected
    pub fn is_busy(&self) -> bool {
        self.task.is_some() || self.snapshot.loading
    }

    // Focus cycling

    fn focus_order(&self) -> Vec<Focus> {
        let mut order: Vec<Focus> = FormField::all().into_iter().map(Focus::Field).collect();
        order.push(Focus::Submit);
        if self.snapshot.started {
            order.push(Focus::Transcript);
            order.push(Focus::FollowUp);
        }
        order
    }

    pub fn focus_next(&mut self) {
        let order = self.focus_order();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(i + 1) % order.len()];
    }

    pub fn focus_prev(&mut self) {
        let order = self.focus_order();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(i + order.len() - 1) % order.len()];
    }

    // Text buffers

    pub fn input_text(&self, target: InputTarget) -> String {
        match target {
            InputTarget::Form(field) => self.controller.input(field),
            InputTarget::FollowUp => self.controller.user_input(),
        }
    }

    pub fn set_input_text(&mut self, target: InputTarget, text: String) {
        match target {
            InputTarget::Form(field) => self.controller.set_input(field, text),
            InputTarget::FollowUp => self.controller.set_user_input(text),
        }
        self.refresh();
    }

    /// Cursor clamped to the current text, which the controller may have cleared
    pub fn cursor(&self, target: InputTarget) -> usize {
        let len = match target {
            InputTarget::Form(field) => self.snapshot.form.get(field).chars().count(),
            InputTarget::FollowUp => self.snapshot.user_input.chars().count(),
        };
        self.cursors.get(&target).copied().unwrap_or(len).min(len)
    }

    pub fn set_cursor(&mut self, target: InputTarget, cursor: usize) {
        self.cursors.insert(target, cursor);
    }

    pub fn can_edit(&self, target: InputTarget) -> bool {
        match target {
            InputTarget::Form(_) => true,
            InputTarget::FollowUp => !self.is_busy(),
        }
    }

    // Operations

    /// Submit button: spawn the inspiration request
    pub fn submit(&mut self) {
        if self.task.is_some() {
            return;
        }

        tracing::debug!("submit pressed");
        let controller = self.controller.clone();
        self.task = Some(tokio::spawn(async move {
            controller.submit_form().await.map(|_| ())
        }));
    }

    /// Send button: spawn the follow-up turn; blank input does nothing
    pub fn send(&mut self) {
        if self.task.is_some() || !self.snapshot.can_send() {
            return;
        }

        tracing::debug!("send pressed");
        let controller = self.controller.clone();
        self.task = Some(tokio::spawn(async move {
            controller.send_user_input().await.map(|_| ())
        }));
        self.set_cursor(InputTarget::FollowUp, 0);
        self.scroll_transcript_to_bottom();
    }

    /// Collect the outstanding operation once it has finished
    pub async fn poll_task(&mut self) {
        if !self.task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        let Some(task) = self.task.take() else {
            return;
        };

        match task.await {
            Ok(Ok(())) => {
                self.refresh();
                if self.snapshot.started && !matches!(self.focus, Focus::Transcript | Focus::FollowUp) {
                    self.focus = Focus::FollowUp;
                }
                self.scroll_transcript_to_bottom();
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "operation failed");
                self.notice = Some(e.notice().to_string());
                self.refresh();
            }
            Err(e) => {
                tracing::error!(error = %e, "operation task did not complete");
                self.notice = Some(GENERIC_FAILURE_NOTICE.to_string());
                self.refresh();
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.pin_transcript = false;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.pin_transcript = false;
        let max = self.transcript_line_count().saturating_sub(self.visible_height());
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(max);
    }

    /// Scroll so the newest message (or the thinking indicator) is visible
    pub fn scroll_transcript_to_bottom(&mut self) {
        let total_lines = self.transcript_line_count() + 2; // "Coach:" + "Denke nach..."
        let visible_height = self.visible_height();
        self.transcript_scroll = total_lines.saturating_sub(visible_height);
        self.pin_transcript = true;
    }

    fn visible_height(&self) -> u16 {
        if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        }
    }

    /// Wrapped line estimate for the transcript at the current width
    fn transcript_line_count(&self) -> u16 {
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.snapshot.transcript() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                total_lines += line.chars().count() / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}
