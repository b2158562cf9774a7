// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::Once;

use log::LevelFilter;

use chatwidget::backend::HttpBackend;
use chatwidget::session::ChatSession;

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

pub fn backend_for(base_url: &str) -> HttpBackend {
    let endpoint = url::Url::parse(base_url).expect("mock server URL");
    HttpBackend::new(&endpoint).expect("backend for mock server")
}

/// Address that refuses connections: bind, note the port, release it
pub fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Text content of every mounted node, in display order
pub fn rendered_texts(session: &ChatSession) -> Vec<String> {
    session
        .messages()
        .items()
        .iter()
        .map(|n| n.text_content())
        .collect()
}

pub fn bot_message_count(session: &ChatSession) -> usize {
    session
        .messages()
        .items()
        .iter()
        .filter(|n| n.has_class("bot") && !n.has_class("typing"))
        .count()
}
