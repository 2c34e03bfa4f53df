//! Text transforms for markup-bearing labels.
//!
//! The core treats the output of a [`TextTransform`] as opaque. [`MarkupTransform`]
//! is the default: it escapes plain text for a Pango-style markup renderer and
//! converts Steam-style BBCode descriptions into that markup, validating the result
//! before handing it out.

use regex::{Captures, Regex};
use thiserror::Error;

/// Malformed markup produced from a rich description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unknown markup tag <{0}>")]
    UnknownTag(String),

    #[error("closing </{0}> without an open tag")]
    UnexpectedClose(String),

    #[error("closing </{found}> while <{expected}> is open")]
    MismatchedClose { expected: String, found: String },

    #[error("<{0}> is never closed")]
    Unclosed(String),
}

/// Display-string collaborator.
pub trait TextTransform: Send + Sync {
    /// Plain text made safe for a markup-bearing label. Never fails.
    fn escape(&self, text: &str) -> String;

    /// Rich description converted to markup. Fails on malformed input.
    fn rich(&self, text: &str) -> Result<String, MarkupError>;
}

/// Tags the renderer understands.
const KNOWN_TAGS: &[&str] = &[
    "a", "b", "big", "i", "s", "small", "span", "sub", "sup", "tt", "u",
];

/// BBCode → Pango-style markup.
pub struct MarkupTransform {
    /// `[tag]`, `[/tag]` or `[tag=value]`
    bbcode_tag: Regex,

    /// `<tag ...>`, `</tag>` or `<tag/>`
    markup_tag: Regex,
}

impl MarkupTransform {
    pub fn new() -> Self {
        Self {
            bbcode_tag: Regex::new(r"(?i)\[(/?)([a-z0-9*]+)(?:=([^\]]*))?\]")
                .expect("Invalid BBCode regex"),
            markup_tag: Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)[^<>]*?(/?)>")
                .expect("Invalid markup tag regex"),
        }
    }

    fn convert_tag(caps: &Captures<'_>) -> String {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let value = caps.get(3).map(|m| m.as_str());

        match (name.as_str(), closing) {
            ("b" | "i" | "u", false) => format!("<{}>", name),
            ("b" | "i" | "u", true) => format!("</{}>", name),
            ("strike" | "s", false) => "<s>".to_string(),
            ("strike" | "s", true) => "</s>".to_string(),
            ("h1" | "h2" | "h3", false) => "<big><b>".to_string(),
            ("h1" | "h2" | "h3", true) => "</b></big>".to_string(),
            ("code", false) => "<tt>".to_string(),
            ("code", true) => "</tt>".to_string(),
            ("url", false) => format!("<a href=\"{}\">", value.unwrap_or_default()),
            ("url", true) => "</a>".to_string(),
            ("list" | "olist", _) => String::new(),
            ("*", false) => "\n• ".to_string(),
            _ => caps[0].to_string(),
        }
    }

    /// Check that every tag is known and properly nested.
    pub fn validate(&self, markup: &str) -> Result<(), MarkupError> {
        let mut open: Vec<String> = Vec::new();

        for caps in self.markup_tag.captures_iter(markup) {
            let closing = !caps[1].is_empty();
            let self_closing = !caps[3].is_empty();
            let name = caps[2].to_ascii_lowercase();

            if !KNOWN_TAGS.contains(&name.as_str()) {
                return Err(MarkupError::UnknownTag(name));
            }
            if self_closing {
                continue;
            }
            if closing {
                match open.pop() {
                    None => return Err(MarkupError::UnexpectedClose(name)),
                    Some(expected) if expected != name => {
                        return Err(MarkupError::MismatchedClose {
                            expected,
                            found: name,
                        });
                    }
                    Some(_) => {}
                }
            } else {
                open.push(name);
            }
        }

        match open.pop() {
            Some(tag) => Err(MarkupError::Unclosed(tag)),
            None => Ok(()),
        }
    }
}

impl Default for MarkupTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTransform for MarkupTransform {
    fn escape(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                _ => escaped.push(c),
            }
        }
        escaped
    }

    fn rich(&self, text: &str) -> Result<String, MarkupError> {
        let escaped = self.escape(text);
        let markup = self
            .bbcode_tag
            .replace_all(&escaped, |caps: &Captures<'_>| Self::convert_tag(caps))
            .into_owned();
        self.validate(&markup)?;
        Ok(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        let transform = MarkupTransform::new();
        assert_eq!(
            transform.escape(r#"Tom & "Jerry" <3 'em"#),
            "Tom &amp; &quot;Jerry&quot; &lt;3 &#39;em"
        );
    }

    #[test]
    fn test_bbcode_conversion() {
        let transform = MarkupTransform::new();
        let markup = transform
            .rich("[b]Bold[/b] and [I]italic[/I] [url=https://example.com]link[/url]")
            .unwrap();

        assert_eq!(
            markup,
            "<b>Bold</b> and <i>italic</i> <a href=\"https://example.com\">link</a>"
        );
    }

    #[test]
    fn test_headings_and_lists() {
        let transform = MarkupTransform::new();
        let markup = transform.rich("[h1]Title[/h1][list][*]one[*]two[/list]").unwrap();
        assert_eq!(markup, "<big><b>Title</b></big>\n• one\n• two");
    }

    #[test]
    fn test_unknown_bbcode_left_as_text() {
        let transform = MarkupTransform::new();
        assert_eq!(transform.rich("[spoiler]x[/spoiler]").unwrap(), "[spoiler]x[/spoiler]");
    }

    #[test]
    fn test_unclosed_tag_rejected() {
        let transform = MarkupTransform::new();
        assert_eq!(
            transform.rich("[b]never closed"),
            Err(MarkupError::Unclosed("b".to_string()))
        );
    }

    #[test]
    fn test_mismatched_tag_rejected() {
        let transform = MarkupTransform::new();
        assert_eq!(
            transform.rich("[b]bold[/i]"),
            Err(MarkupError::MismatchedClose {
                expected: "b".to_string(),
                found: "i".to_string(),
            })
        );
    }

    #[test]
    fn test_stray_close_rejected() {
        let transform = MarkupTransform::new();
        assert_eq!(
            transform.rich("text[/u]"),
            Err(MarkupError::UnexpectedClose("u".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_unknown_tags() {
        let transform = MarkupTransform::new();
        assert_eq!(
            transform.validate("<blink>x</blink>"),
            Err(MarkupError::UnknownTag("blink".to_string()))
        );
        assert!(transform.validate("<span foreground=\"red\">x</span>").is_ok());
    }

    #[test]
    fn test_escaped_angle_brackets_are_not_tags() {
        let transform = MarkupTransform::new();
        assert_eq!(transform.rich("<b>raw</b>").unwrap(), "&lt;b&gt;raw&lt;/b&gt;");
    }
}
