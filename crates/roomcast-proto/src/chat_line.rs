//! Text line delivered to room members.
//!
//! The server forwards each accepted datagram to the other members as the raw
//! bytes `"{display_name}> {message}"`. There is no header: the line is the
//! whole datagram.

use bytes::{BufMut, Bytes, BytesMut};

/// Separator between the sender's display name and the message.
pub const SEPARATOR: &str = "> ";

/// One delivered chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Display name of the sender
    pub display_name: String,
    /// Message text
    pub message: String,
}

impl ChatLine {
    /// Render the outbound bytes for a message from `display_name`.
    ///
    /// The message is copied verbatim, so non-UTF-8 payloads pass through.
    #[must_use]
    pub fn render(display_name: &str, message: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(display_name.len() + SEPARATOR.len() + message.len());
        buf.put_slice(display_name.as_bytes());
        buf.put_slice(SEPARATOR.as_bytes());
        buf.put_slice(message);
        buf.freeze()
    }

    /// Whether `name` can be rendered and parsed back unchanged.
    ///
    /// A name containing the separator would move part of itself into the
    /// message on [`Self::parse`].
    #[must_use]
    pub fn is_valid_display_name(name: &str) -> bool {
        !name.is_empty() && !name.contains(SEPARATOR)
    }

    /// Split a received line at the first separator.
    ///
    /// Lines without a separator are returned with an empty display name.
    /// Invalid UTF-8 is replaced rather than rejected; this is display text.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        match text.split_once(SEPARATOR) {
            Some((name, message)) => {
                Self { display_name: name.to_string(), message: message.to_string() }
            },
            None => Self { display_name: String::new(), message: text.into_owned() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_matches_wire_format() {
        assert_eq!(&ChatLine::render("B", b"hi")[..], b"B> hi");
    }

    #[test]
    fn parse_splits_on_first_separator() {
        let line = ChatLine::parse(b"alice> look> here");
        assert_eq!(line.display_name, "alice");
        assert_eq!(line.message, "look> here");
    }

    #[test]
    fn display_name_must_not_contain_separator() {
        assert!(ChatLine::is_valid_display_name("alice"));
        assert!(ChatLine::is_valid_display_name("a>b"));
        assert!(!ChatLine::is_valid_display_name(""));
        assert!(!ChatLine::is_valid_display_name("eve> admin"));

        let line = ChatLine::parse(&ChatLine::render("eve> admin", b"hi"));
        assert_ne!(line.display_name, "eve> admin");
    }

    #[test]
    fn parse_without_separator() {
        let line = ChatLine::parse(b"system notice");
        assert_eq!(line.display_name, "");
        assert_eq!(line.message, "system notice");
    }
}
