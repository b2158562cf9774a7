//! "Bot is typing" placeholder.

use log::debug;

use crate::view::{Element, MessageList, Tag};

pub const TYPING_MARKER: &str = "data-typing";
pub const TYPING_LABEL: &str = "Digitando ";

#[derive(Debug, Default)]
pub struct TypingIndicator {
    visible: bool,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self, list: &mut MessageList) {
        if self.visible {
            return;
        }
        self.visible = true;

        let dots = (0..3).fold(Element::new(Tag::Span).class("dots"), |dots, _| {
            dots.child(Element::new(Tag::Span).class("dot").into_node())
        });
        let bubble = Element::new(Tag::Div)
            .class("bubble")
            .child(Element::new(Tag::Span).text(TYPING_LABEL).into_node())
            .child(dots.into_node());
        let node = Element::new(Tag::ListItem)
            .class("message bot typing")
            .attr(TYPING_MARKER, "true")
            .child(bubble.into_node())
            .into_node();

        list.mount(node);
    }

    pub fn hide(&mut self, list: &mut MessageList) {
        let removed = list.remove_marked(TYPING_MARKER, "true");
        if removed > 0 {
            debug!("Removed {} typing indicator node(s)", removed);
        }
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_twice_mounts_one_node() {
        let mut list = MessageList::new();
        let mut typing = TypingIndicator::new();
        typing.show(&mut list);
        typing.show(&mut list);
        assert!(typing.is_visible());
        assert_eq!(list.count_marked(TYPING_MARKER, "true"), 1);
        assert!(list.last().unwrap().has_class("typing"));
    }

    #[test]
    fn test_hide_without_show() {
        let mut list = MessageList::new();
        let mut typing = TypingIndicator::new();
        typing.hide(&mut list);
        assert!(!typing.is_visible());
        assert!(list.is_empty());
    }

    #[test]
    fn test_show_after_hide() {
        let mut list = MessageList::new();
        let mut typing = TypingIndicator::new();
        typing.show(&mut list);
        typing.hide(&mut list);
        assert_eq!(list.count_marked(TYPING_MARKER, "true"), 0);
        typing.show(&mut list);
        assert_eq!(list.count_marked(TYPING_MARKER, "true"), 1);
        assert_eq!(list.last().unwrap().text_content(), TYPING_LABEL);
    }
}
