// Library side of the chat widget; the terminal front end lives in main.rs/ui.rs
pub mod attachments;
pub mod backend;
pub mod config;
pub mod connectivity;
pub mod input;
pub mod models;
pub mod session;
pub mod suggestions;
pub mod typing;
pub mod view;

// Re-export main types for convenience
pub use backend::{BackendError, ChatBackend, HttpBackend};
pub use models::*;
pub use session::ChatSession;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_state_from_platform_boolean() {
        assert_eq!(ConnectivityState::from(true), ConnectivityState::Online);
        assert_eq!(ConnectivityState::from(false), ConnectivityState::Offline);
        assert_eq!(ConnectivityState::Online.to_string(), "online");
        assert_eq!(ConnectivityState::Offline.to_string(), "offline");
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::new(Author::User, Payload::text("Olá"));
        assert_eq!(msg.author, Author::User);
        assert_eq!(msg.payload, Payload::Text("Olá".to_string()));
        assert!(!msg.id.is_empty());

        let other = Message::new(Author::User, Payload::text("Olá"));
        assert_ne!(msg.id, other.id);
    }

    #[test]
    fn test_author_classes() {
        assert_eq!(Author::User.as_class(), "user");
        assert_eq!(Author::Bot.as_class(), "bot");
    }

    #[test]
    fn test_default_status_is_offline() {
        let status = StatusLine::default();
        assert_eq!(status.label, "offline");
        assert_eq!(status.tone, StatusTone::Error);
    }
}
