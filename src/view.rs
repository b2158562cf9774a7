//! Presentation renderer.
//!
//! Messages are turned into a small element tree first (`build_message`) and
//! only then mounted onto a [`MessageList`]. The tree is plain data, so the
//! terminal front end and the tests read the same structure.

use std::collections::BTreeMap;

use crate::models::{Author, Message, Payload};

pub const DEFAULT_IMAGE_NAME: &str = "Imagem";
pub const DEFAULT_FILE_NAME: &str = "arquivo";

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    ListItem,
    Div,
    Span,
    Image,
    Link,
    Icon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Literal text. Never parsed as markup.
    Text(String),
}

impl Element {
    pub fn new(tag: Tag) -> Self {
        Element {
            tag,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.extend(class.split_whitespace().map(str::to_string));
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn into_node(self) -> Node {
        Node::Element(self)
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    /// Depth-first search, starting with this element
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.as_element()
            .and_then(|e| e.attrs.get(key))
            .map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.as_element().map_or(false, |e| e.has_class(class))
    }

    /// Concatenated text of this node and all descendants, in document order
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Element(e) => e.text_content(),
        }
    }

    /// Depth-first search for the first element matching `pred`
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        self.as_element()?.find(pred)
    }
}

/// Human readable byte size: 500 B, 1.5 KB, 2 KB, 1 GB.
///
/// Below 10 of a unit larger than bytes one decimal is kept, except a
/// trailing `.0`, so 10239 bytes shows as `10 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let number = if unit > 0 && size < 10.0 {
        let rounded = format!("{:.1}", size);
        match rounded.strip_suffix(".0") {
            Some(whole) => whole.to_string(),
            None => rounded,
        }
    } else {
        format!("{:.0}", size)
    };
    format!("{} {}", number, SIZE_UNITS[unit])
}

/// Build the list item for one message. Pure; nothing is mounted.
pub fn build_message(author: Author, payload: &Payload) -> Element {
    let bubble = Element::new(Tag::Div).class("bubble");

    let bubble = match payload {
        Payload::Text(text) => bubble.text(text.clone()),
        Payload::Image { url, name } => {
            let name = name.as_deref().unwrap_or(DEFAULT_IMAGE_NAME);
            let img = Element::new(Tag::Image)
                .class("thumb")
                .attr("src", url.clone())
                .attr("alt", name);
            let caption = Element::new(Tag::Div).class("meta").text(name);
            bubble.child(img.into_node()).child(caption.into_node())
        }
        Payload::File { url, name, size } => {
            let name = name.as_deref().unwrap_or(DEFAULT_FILE_NAME);
            let label = match size {
                Some(bytes) if *bytes > 0 => format!("{} • {}", name, format_size(*bytes)),
                _ => name.to_string(),
            };
            let link = Element::new(Tag::Link)
                .class("file-pill")
                .attr("href", url.clone())
                .attr("download", name)
                .child(Element::new(Tag::Icon).attr("aria-hidden", "true").into_node())
                .text(label);
            bubble.child(link.into_node())
        }
    };

    Element::new(Tag::ListItem)
        .class("message")
        .class(author.as_class())
        .child(bubble.into_node())
}

/// The visible message list: mounted nodes plus a scroll position that
/// follows the newest entry.
#[derive(Debug, Default)]
pub struct MessageList {
    items: Vec<Node>,
    scroll_offset: usize,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, node: Node) {
        self.items.push(node);
        self.scroll_to_bottom();
    }

    /// Build and mount a message in one step
    pub fn render(&mut self, message: &Message) {
        let time = chrono::DateTime::from_timestamp(message.timestamp as i64, 0)
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M").to_string())
            .unwrap_or_default();
        let node = build_message(message.author, &message.payload)
            .attr("data-id", message.id.clone())
            .attr("data-time", time);
        self.mount(node.into_node());
    }

    /// Remove every top-level node carrying `key="value"`. Returns how many
    /// were removed.
    pub fn remove_marked(&mut self, key: &str, value: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|n| n.attr(key) != Some(value));
        let removed = before - self.items.len();
        if removed > 0 {
            self.scroll_offset = self.scroll_offset.min(self.max_scroll());
        }
        removed
    }

    pub fn count_marked(&self, key: &str, value: &str) -> usize {
        self.items.iter().filter(|n| n.attr(key) == Some(value)).count()
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    pub fn max_scroll(&self) -> usize {
        self.items.len().saturating_sub(1)
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&Node> {
        self.items.last()
    }
}
