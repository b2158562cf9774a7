use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::{io, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use chatwidget::attachments::parse_paths;
use chatwidget::input::InputController;
use chatwidget::session::{ChatSession, SendTicket};
use chatwidget::typing::TYPING_LABEL;
use chatwidget::view::{Node, Tag};
use chatwidget::StatusTone;

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

const BUSY_NOTICE: &str = "Aguarde a resposta anterior.";

/// What the main loop has to do after a key press
#[derive(Debug)]
pub enum UiAction {
    Quit,
    Send(SendTicket),
}

pub struct ChatUI {
    pub session: ChatSession,
    input: InputController,
    focus: Focus,
    selected_reply: usize,
    attach_dialog: Option<AttachDialog>,
    help_dialog: bool,
    notice: Option<Notice>,
    tick: usize,
}

struct AttachDialog {
    input: Input,
}

// Transient line above the composer, dismissed after a few seconds
struct Notice {
    text: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Copy, PartialEq)]
enum Focus {
    Composer,
    QuickReplies,
}

impl ChatUI {
    pub fn new(session: ChatSession) -> Self {
        ChatUI {
            session,
            input: InputController::new(),
            focus: Focus::Composer,
            selected_reply: 0,
            attach_dialog: None,
            help_dialog: false,
            notice: None,
            tick: 0,
        }
    }

    /// Called once per frame; drives the typing dots
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn set_terminal_width(&mut self, width: u16) {
        self.input.set_wrap_width(width.saturating_sub(2) as usize);
    }

    pub fn show_notice(&mut self, text: &str) {
        debug!("UI: notice '{}'", text);
        self.notice = Some(Notice {
            text: text.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn clean_notices(&mut self, timeout_secs: i64) {
        if let Some(notice) = &self.notice {
            if (chrono::Utc::now() - notice.timestamp).num_seconds() > timeout_secs {
                self.notice = None;
            }
        }
    }

    fn submit_draft(&mut self) -> Option<UiAction> {
        // Blank drafts are ignored silently, busy or not
        if self.input.value().trim().is_empty() {
            return None;
        }
        if self.session.is_busy() {
            self.show_notice(BUSY_NOTICE);
            return None;
        }
        let text = self.input.take_submission()?;
        self.selected_reply = 0;
        self.session.submit(text).map(UiAction::Send)
    }

    fn attach(&mut self, raw: &str) {
        let paths = parse_paths(raw);
        if paths.is_empty() {
            return;
        }
        info!("UI: attaching {} file(s)", paths.len());
        let failures = self.session.attach_files(&paths);
        if let Some(first) = failures.first() {
            self.show_notice(&format!("Não foi possível anexar: {}", first));
        }
    }

    pub fn handle_input(&mut self) -> Result<Option<UiAction>> {
        if !event::poll(Duration::from_millis(10))? {
            return Ok(None);
        }
        let event = event::read()?;
        let key = match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => return Ok(None),
        };

        // Help dialog: any key closes it
        if self.help_dialog {
            self.help_dialog = false;
            return Ok(None);
        }

        // Attach dialog
        if let Some(dialog) = self.attach_dialog.as_mut() {
            match key.code {
                KeyCode::Esc => self.attach_dialog = None,
                KeyCode::Enter => {
                    let raw = dialog.input.value().to_string();
                    self.attach_dialog = None;
                    self.attach(&raw);
                }
                _ => {
                    dialog.input.handle_event(&event);
                }
            }
            return Ok(None);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return Ok(Some(UiAction::Quit)),
                KeyCode::Char('o') => {
                    self.attach_dialog = Some(AttachDialog { input: Input::default() });
                    return Ok(None);
                }
                KeyCode::Char('h') => {
                    self.help_dialog = true;
                    return Ok(None);
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Esc => return Ok(Some(UiAction::Quit)),
            // Some terminals send Ctrl+H as backspace
            KeyCode::F(1) => {
                self.help_dialog = true;
                return Ok(None);
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Composer if !self.session.quick_replies().is_empty() => Focus::QuickReplies,
                    _ => Focus::Composer,
                };
                return Ok(None);
            }
            _ => {}
        }

        match self.focus {
            Focus::Composer => Ok(self.handle_composer_key(key, &event)),
            Focus::QuickReplies => Ok(self.handle_quick_reply_key(key)),
        }
    }

    fn handle_composer_key(&mut self, key: KeyEvent, event: &Event) -> Option<UiAction> {
        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.input.insert_newline();
                None
            }
            KeyCode::Enter => self.submit_draft(),
            _ => {
                self.input.handle_event(event);
                None
            }
        }
    }

    fn handle_quick_reply_key(&mut self, key: KeyEvent) -> Option<UiAction> {
        let count = self.session.quick_replies().len();
        if count == 0 {
            self.focus = Focus::Composer;
            return None;
        }
        match key.code {
            KeyCode::Left => {
                self.selected_reply = (self.selected_reply + count - 1) % count;
                None
            }
            KeyCode::Right => {
                self.selected_reply = (self.selected_reply + 1) % count;
                None
            }
            KeyCode::Enter => {
                // The draft is only replaced when the reply can actually go out
                if self.session.is_busy() {
                    self.show_notice(BUSY_NOTICE);
                    return None;
                }
                let reply = self.session.quick_reply(self.selected_reply.min(count - 1))?.to_string();
                self.focus = Focus::Composer;
                // Pre-fill the composer, then send as if typed
                self.input.set_value(reply);
                self.submit_draft()
            }
            _ => None,
        }
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>) {
        let size = frame.size();
        let notice_height = if self.notice.is_some() { 1 } else { 0 };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),                        // Header with status
                Constraint::Min(3),                           // Messages
                Constraint::Length(notice_height),            // Notice
                Constraint::Length(1),                        // Quick replies
                Constraint::Length(self.input.height() + 2),  // Composer
                Constraint::Length(1),                        // Help line
            ])
            .split(size);

        draw_header(frame, self, chunks[0]);
        draw_messages(frame, self, chunks[1]);

        if let Some(notice) = &self.notice {
            let line = Paragraph::new(notice.text.as_str()).style(Style::default().fg(Color::Yellow));
            frame.render_widget(line, chunks[2]);
        }

        draw_quick_replies(frame, self, chunks[3]);

        let input_block = Block::default()
            .title("Mensagem")
            .borders(Borders::ALL)
            .border_style(match self.focus {
                Focus::Composer => Style::default().fg(Color::Yellow),
                Focus::QuickReplies => Style::default(),
            });
        let input_widget = Paragraph::new(self.input.value())
            .block(input_block)
            .wrap(Wrap { trim: false });
        frame.render_widget(input_widget, chunks[4]);

        let help = Paragraph::new(Line::from(vec![Span::styled(
            "Enter enviar | Shift+Enter nova linha | Tab sugestões | Ctrl+O anexar | F1 ajuda | Esc sair",
            Style::default().fg(Color::Gray),
        )]));
        frame.render_widget(help, chunks[5]);

        if self.focus == Focus::Composer && self.attach_dialog.is_none() && !self.help_dialog {
            let (x, y) = self.composer_cursor(chunks[4].width.saturating_sub(2) as usize);
            frame.set_cursor(chunks[4].x + 1 + x, chunks[4].y + 1 + y);
        }

        if let Some(dialog) = &self.attach_dialog {
            draw_attach_dialog(frame, dialog, size);
        }
        if self.help_dialog {
            draw_help_dialog(frame, size);
        }
    }

    // Cursor position inside the composer, from the text before the cursor
    fn composer_cursor(&self, width: usize) -> (u16, u16) {
        let before: String = self.input.value().chars().take(self.input.cursor()).collect();
        let rows = chatwidget::input::content_rows(&before, width);
        let last_line = before.rsplit('\n').next().unwrap_or("");
        let col = wrap(last_line, width.max(1))
            .last()
            .map(|l| l.chars().count())
            .unwrap_or(0);
        let row = rows.saturating_sub(1).min(self.input.height().saturating_sub(1) as usize);
        (col as u16, row as u16)
    }
}

fn draw_header<B: Backend>(f: &mut Frame<B>, ui: &ChatUI, area: Rect) {
    let status = ui.session.status();
    let dot_style = match status.tone {
        StatusTone::Success => Style::default().fg(Color::Green),
        StatusTone::Error => Style::default().fg(Color::Red),
    };
    let mut spans = vec![
        Span::styled("Assistente virtual ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("● ", dot_style),
        Span::raw(status.label.clone()),
    ];
    if ui.session.is_busy() {
        spans.push(Span::styled("  (aguardando resposta)", Style::default().fg(Color::Gray)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// One-line textual form of a mounted message bubble
fn bubble_text(node: &Node, tick: usize) -> String {
    if node.has_class("typing") {
        return format!("{}{}", TYPING_LABEL, ".".repeat(tick / 10 % 3 + 1));
    }
    if let Some(img) = node.find(&|e| e.tag == Tag::Image) {
        let caption = node
            .find(&|e| e.has_class("meta"))
            .map(|m| m.text_content())
            .unwrap_or_default();
        let src = img.attrs.get("src").cloned().unwrap_or_default();
        return format!("🖼  {} <{}>", caption, src);
    }
    if let Some(link) = node.find(&|e| e.tag == Tag::Link) {
        let href = link.attrs.get("href").cloned().unwrap_or_default();
        return format!("📎 {} <{}>", link.text_content(), href);
    }
    node.text_content()
}

fn draw_messages<B: Backend>(f: &mut Frame<B>, ui: &ChatUI, area: Rect) {
    let wrap_width = area.width.saturating_sub(2).max(1) as usize; // Account for borders
    let list = ui.session.messages();

    let mut items: Vec<ListItem> = Vec::new();
    let mut last_line_of_offset = 0;
    for (index, node) in list.items().iter().enumerate() {
        let is_user = node.has_class("user");
        let time = node.attr("data-time").unwrap_or("");
        let who = if is_user { "Você" } else { "Assistente" };
        let prefix = if time.is_empty() {
            format!("{}: ", who)
        } else {
            format!("[{}] {}: ", time, who)
        };
        let full_content = format!("{}{}", prefix, bubble_text(node, ui.tick));

        let style = if node.has_class("typing") {
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)
        } else if is_user {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };

        for line in wrap(&full_content, wrap_width) {
            items.push(ListItem::new(Text::from(line.into_owned())).style(style));
        }
        if index == list.scroll_offset() {
            last_line_of_offset = items.len().saturating_sub(1);
        }
    }

    // Selecting the line keeps it in view; the highlight style is blank
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(last_line_of_offset));
    }

    let messages_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Conversa"))
        .highlight_style(Style::default());
    f.render_stateful_widget(messages_list, area, &mut list_state);
}

fn draw_quick_replies<B: Backend>(f: &mut Frame<B>, ui: &ChatUI, area: Rect) {
    let mut spans = vec![Span::styled("Sugestões: ", Style::default().fg(Color::Gray))];
    for (i, reply) in ui.session.quick_replies().iter().enumerate() {
        let style = if ui.focus == Focus::QuickReplies && i == ui.selected_reply {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::Yellow)
        };
        spans.push(Span::styled(format!("[{}]", reply), style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        (area.width.saturating_sub(width)) / 2,
        (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn draw_attach_dialog<B: Backend>(f: &mut Frame<B>, dialog: &AttachDialog, area: Rect) {
    let popup_area = centered(area, 70, 7);

    let popup_block = Block::default()
        .title("Anexar arquivos")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    f.render_widget(Clear, popup_area); // Clear the area first
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3)])
        .split(inner_area);

    f.render_widget(
        Paragraph::new("Caminho do arquivo (vários separados por ';'), Enter confirma, Esc cancela"),
        chunks[0],
    );

    let input_widget = Paragraph::new(dialog.input.value()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(input_widget, chunks[1]);
    f.set_cursor(chunks[1].x + dialog.input.cursor() as u16 + 1, chunks[1].y + 1);
}

fn draw_help_dialog<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let popup_area = centered(area, 60, 12);

    let popup_block = Block::default()
        .title("Atalhos")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });

    let shortcuts = [
        ("Enter", "Enviar mensagem"),
        ("Shift+Enter", "Nova linha"),
        ("Tab", "Alternar entre mensagem e sugestões"),
        ("←/→", "Escolher sugestão"),
        ("Ctrl+O", "Anexar arquivos"),
        ("Ctrl+H / F1", "Mostrar esta ajuda"),
        ("Esc", "Sair"),
        ("", ""),
        ("Qualquer tecla fecha esta janela", ""),
    ];

    let items: Vec<ListItem> = shortcuts
        .iter()
        .map(|(key, desc)| {
            if desc.is_empty() {
                ListItem::new(key.to_string())
            } else {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<13}", key), Style::default().fg(Color::Green)),
                    Span::raw(desc.to_string()),
                ]))
            }
        })
        .collect();
    f.render_widget(List::new(items), inner_area);
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
