//! The UI session: every piece of widget state lives here and is mutated
//! only through these methods.

use log::{debug, error, info, warn};
use std::path::PathBuf;

use crate::attachments::{Attachment, AttachmentError};
use crate::backend::{BackendError, ChatBackend};
use crate::connectivity::ConnectivityMonitor;
use crate::models::{Author, ConnectivityState, Message, Payload, StatusLine};
use crate::suggestions;
use crate::typing::TypingIndicator;
use crate::view::MessageList;

pub const WELCOME_MESSAGE: &str = "Olá! Sou seu assistente virtual. Como posso ajudar?";
pub const FALLBACK_REPLY: &str = "Desculpe, não entendi. Pode repetir?";
pub const ERROR_REPLY: &str = "Erro ao se comunicar com o servidor.";

pub fn attachment_ack(name: &str) -> String {
    format!("Recebemos o arquivo: {}", name)
}

/// Handle for the one request allowed in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    pub id: u64,
    pub text: String,
}

#[derive(Debug)]
pub struct ChatSession {
    messages: MessageList,
    typing: TypingIndicator,
    quick_replies: Vec<String>,
    status: StatusLine,
    connectivity: ConnectivityMonitor,
    in_flight: Option<u64>,
    next_request: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        ChatSession {
            messages: MessageList::new(),
            typing: TypingIndicator::new(),
            quick_replies: suggestions::initial(),
            status: StatusLine::default(),
            connectivity: ConnectivityMonitor::new(),
            in_flight: None,
            next_request: 1,
        }
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn greet(&mut self) {
        self.render(Author::Bot, Payload::text(WELCOME_MESSAGE));
    }

    pub fn messages(&self) -> &MessageList {
        &self.messages
    }

    pub fn quick_replies(&self) -> &[String] {
        &self.quick_replies
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_visible()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn render(&mut self, author: Author, payload: Payload) {
        self.messages.render(&Message::new(author, payload));
    }

    pub fn set_quick_replies(&mut self, items: Vec<String>) {
        self.quick_replies = items;
    }

    pub fn quick_reply(&self, index: usize) -> Option<&str> {
        self.quick_replies.get(index).map(String::as_str)
    }

    pub fn on_connectivity(&mut self, online: bool) -> ConnectivityState {
        self.connectivity.on_signal(online, &mut self.status)
    }

    /// Render the user's text and start a request for it. Returns `None`
    /// (and renders nothing) while another request is in flight.
    pub fn submit(&mut self, text: String) -> Option<SendTicket> {
        if self.is_busy() {
            debug!("Submit refused, request {:?} still in flight", self.in_flight);
            return None;
        }
        self.render(Author::User, Payload::Text(text.clone()));
        self.begin_send(text)
    }

    /// Show the typing indicator and take the in-flight slot
    pub fn begin_send(&mut self, text: String) -> Option<SendTicket> {
        if self.is_busy() {
            return None;
        }
        let id = self.next_request;
        self.next_request += 1;
        self.in_flight = Some(id);
        self.typing.show(&mut self.messages);
        debug!("Request {} started", id);
        Some(SendTicket { id, text })
    }

    /// Apply the outcome of a request started with [`begin_send`].
    ///
    /// [`begin_send`]: ChatSession::begin_send
    pub fn complete_send(&mut self, ticket: SendTicket, result: Result<Vec<String>, BackendError>) {
        if self.in_flight != Some(ticket.id) {
            warn!("Ignoring result for request {} (in flight: {:?})", ticket.id, self.in_flight);
            return;
        }
        self.in_flight = None;
        self.typing.hide(&mut self.messages);

        match result {
            Ok(replies) if replies.is_empty() => {
                info!("Request {} returned no replies", ticket.id);
                self.render(Author::Bot, Payload::text(FALLBACK_REPLY));
                self.quick_replies = suggestions::suggest(&ticket.text);
            }
            Ok(replies) => {
                info!("Request {} returned {} replies", ticket.id, replies.len());
                for reply in replies {
                    self.render(Author::Bot, Payload::Text(reply));
                }
                self.quick_replies = suggestions::suggest(&ticket.text);
            }
            Err(e) => {
                error!("Request {} failed: {}", ticket.id, e);
                self.render(Author::Bot, Payload::text(ERROR_REPLY));
            }
        }
    }

    /// Full send cycle against `backend`, awaiting the reply in place.
    /// Returns false when refused because another request is in flight.
    pub async fn send(&mut self, backend: &dyn ChatBackend, text: &str) -> bool {
        let ticket = match self.begin_send(text.to_string()) {
            Some(ticket) => ticket,
            None => return false,
        };
        let result = backend.ask(&ticket.text).await;
        self.complete_send(ticket, result);
        true
    }

    /// Render each file as a user message followed by the local
    /// acknowledgement. Files that cannot be read are skipped and returned.
    pub fn attach_files(&mut self, paths: &[PathBuf]) -> Vec<AttachmentError> {
        let mut failures = Vec::new();
        for path in paths {
            match Attachment::from_path(path) {
                Ok(attachment) => {
                    info!("Attached {} ({}, {} bytes)", attachment.display_name(), attachment.mime, attachment.size);
                    self.render(Author::User, attachment.to_payload());
                    self.render(Author::Bot, Payload::Text(attachment_ack(attachment.display_name())));
                }
                Err(e) => {
                    warn!("Skipping attachment: {}", e);
                    failures.push(e);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::TYPING_MARKER;
    use crate::view::Tag;

    fn texts(session: &ChatSession) -> Vec<String> {
        session.messages().items().iter().map(|n| n.text_content()).collect()
    }

    #[test]
    fn test_submit_renders_user_message_before_request() {
        let mut session = ChatSession::new();
        let ticket = session.submit("Olá".to_string()).unwrap();
        let items = session.messages().items();
        assert_eq!(items.len(), 2);
        assert!(items[0].has_class("user"));
        assert_eq!(items[0].text_content(), "Olá");
        assert!(items[1].has_class("typing"));
        assert_eq!(ticket.text, "Olá");
        assert!(session.is_busy());
    }

    #[test]
    fn test_empty_replies_render_fallback() {
        let mut session = ChatSession::new();
        let ticket = session.submit("boleto".to_string()).unwrap();
        session.complete_send(ticket, Ok(vec![]));
        assert_eq!(texts(&session), vec!["boleto", FALLBACK_REPLY]);
        assert_eq!(session.quick_replies(), &["Ver boleto", "Gerar nova via"]);
        assert!(!session.is_typing());
    }

    #[test]
    fn test_replies_render_in_order() {
        let mut session = ChatSession::new();
        let ticket = session.submit("nada a ver".to_string()).unwrap();
        session.complete_send(ticket, Ok(vec!["A".into(), "B".into()]));
        assert_eq!(texts(&session), vec!["nada a ver", "A", "B"]);
        assert!(session.messages().items()[1].has_class("bot"));
        assert_eq!(session.quick_replies().len(), 3);
    }

    #[test]
    fn test_failure_renders_one_error_and_keeps_quick_replies() {
        let mut session = ChatSession::new();
        let before = session.quick_replies().to_vec();
        let ticket = session.submit("curso".to_string()).unwrap();
        session.complete_send(ticket, Err(BackendError::Transport("connection refused".into())));
        assert_eq!(texts(&session), vec!["curso", ERROR_REPLY]);
        assert_eq!(session.messages().count_marked(TYPING_MARKER, "true"), 0);
        assert_eq!(session.quick_replies(), before.as_slice());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_second_submit_is_refused_while_in_flight() {
        let mut session = ChatSession::new();
        let first = session.submit("um".to_string()).unwrap();
        assert!(session.submit("dois".to_string()).is_none());
        assert_eq!(session.messages().len(), 2);

        session.complete_send(first, Ok(vec!["ok".into()]));
        assert!(session.submit("dois".to_string()).is_some());
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut session = ChatSession::new();
        let ticket = session.submit("um".to_string()).unwrap();
        let stale = SendTicket { id: ticket.id + 10, text: "x".into() };
        session.complete_send(stale, Ok(vec!["late".into()]));
        assert!(session.is_typing());
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_attach_files_acknowledges_each_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("foto.jpg");
        let doc = dir.path().join("contrato.pdf");
        std::fs::write(&image, b"jpg").unwrap();
        std::fs::write(&doc, vec![0u8; 1536]).unwrap();

        let mut session = ChatSession::new();
        let failures = session.attach_files(&[image, dir.path().join("sumiu.txt"), doc]);
        assert_eq!(failures.len(), 1);

        let items = session.messages().items();
        assert_eq!(items.len(), 4);
        assert!(items[0].find(&|e| e.tag == Tag::Image).is_some());
        assert_eq!(items[1].text_content(), attachment_ack("foto.jpg"));
        assert_eq!(items[2].text_content(), "contrato.pdf • 1.5 KB");
        assert_eq!(items[3].text_content(), "Recebemos o arquivo: contrato.pdf");
        assert!(!session.is_busy());
    }

    #[test]
    fn test_greet_and_connectivity() {
        let mut session = ChatSession::new();
        session.greet();
        assert_eq!(texts(&session), vec![WELCOME_MESSAGE]);
        session.on_connectivity(true);
        assert_eq!(session.status().label, "online");
        session.on_connectivity(false);
        assert_eq!(session.status().label, "offline");
    }
}
