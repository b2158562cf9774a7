use crossterm::event::Event;
use tui_input::{backend::crossterm::EventHandler, Input};

/// Upper bound for the auto-sized input box
pub const MAX_INPUT_HEIGHT: u16 = 140;

/// Message composer: holds the draft and its auto-computed height.
#[derive(Debug)]
pub struct InputController {
    input: Input,
    wrap_width: usize,
    height: u16,
}

impl Default for InputController {
    fn default() -> Self {
        InputController {
            input: Input::default(),
            wrap_width: 80,
            height: 1,
        }
    }
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn cursor(&self) -> usize {
        self.input.cursor()
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.input = self.input.clone().with_value(value.into());
        self.auto_grow();
    }

    pub fn insert_newline(&mut self) {
        let value = format!("{}\n", self.input.value());
        self.set_value(value);
    }

    /// Feed a terminal event to the draft (typing, deletion, cursor moves)
    pub fn handle_event(&mut self, event: &Event) {
        self.input.handle_event(event);
        self.auto_grow();
    }

    /// Width used for wrapping when computing the height. Set by the layout.
    pub fn set_wrap_width(&mut self, width: usize) {
        let width = width.max(1);
        if width != self.wrap_width {
            self.wrap_width = width;
            self.auto_grow();
        }
    }

    /// Trimmed draft, clearing the input. Whitespace-only drafts return
    /// `None` and stay untouched.
    pub fn take_submission(&mut self) -> Option<String> {
        let text = self.input.value().trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        self.input.reset();
        self.auto_grow();
        Some(text)
    }

    fn auto_grow(&mut self) {
        self.height = grow_height(content_rows(self.input.value(), self.wrap_width));
    }
}

/// Rows the draft occupies once wrapped
pub fn content_rows(value: &str, width: usize) -> usize {
    value
        .split('\n')
        .map(|line| textwrap::wrap(line, width.max(1)).len().max(1))
        .sum()
}

/// Intrinsic content height, capped at [`MAX_INPUT_HEIGHT`]
pub fn grow_height(content: usize) -> u16 {
    let content = u16::try_from(content).unwrap_or(u16::MAX);
    content.max(1).min(MAX_INPUT_HEIGHT)
}
