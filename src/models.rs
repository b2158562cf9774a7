use std::fmt;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Bot,
}

impl Author {
    /// Class name used on the list item (`message user` / `message bot`)
    pub fn as_class(&self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Bot => "bot",
        }
    }
}

/// What a message carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Image {
        url: String,
        name: Option<String>,
    },
    File {
        url: String,
        name: Option<String>,
        size: Option<u64>,
    },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub author: Author,
    pub payload: Payload,
    pub timestamp: u64,
}

impl Message {
    pub fn new(author: Author, payload: Payload) -> Self {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            author,
            payload,
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectivityState::Online => "online",
            ConnectivityState::Offline => "offline",
        }
    }
}

impl From<bool> for ConnectivityState {
    fn from(online: bool) -> Self {
        if online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tone of the status indicator dot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Error,
}

/// Status label plus indicator, as shown in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub label: String,
    pub tone: StatusTone,
}

impl Default for StatusLine {
    fn default() -> Self {
        StatusLine {
            label: ConnectivityState::Offline.label().to_string(),
            tone: StatusTone::Error,
        }
    }
}
