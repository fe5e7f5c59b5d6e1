//! Live preview of a notification subject and body.
//!
//! Placeholders are written `{{key}}`. Keys present in the data mapping are
//! substituted; word keys without a value are kept visible as `[[key]]`
//! markers so the author can see what is still missing.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const MISSING_STYLE: &str = "color: #ff4d4f";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("valid placeholder regex"))
}

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"^\w+$").expect("valid word regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Missing(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    segments: Vec<Segment>,
}

impl Rendered {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Text(text.to_string()));
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn missing_keys(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Missing(key) => Some(key.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_keys().is_empty()
    }

    /// Plain rendering with `[[key]]` markers.
    pub fn to_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Missing(key) => format!("[[{}]]", key),
            })
            .collect()
    }

    /// Markup rendering. Text, including substituted values, is escaped
    /// before the marker spans are inserted.
    pub fn to_html(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => escape_html(text),
                Segment::Missing(key) => format!(
                    "<span style=\"{}\">[[{}]]</span>",
                    MISSING_STYLE,
                    escape_html(key)
                ),
            })
            .collect()
    }
}

impl std::fmt::Display for Rendered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    pub subject: Rendered,
    pub content: Rendered,
}

impl Preview {
    pub fn is_empty(&self) -> bool {
        self.subject.segments.is_empty() && self.content.segments.is_empty()
    }
}

pub fn render(pattern: &str, data: &BTreeMap<String, String>) -> Rendered {
    let mut rendered = Rendered::default();
    let mut last = 0;

    for captures in placeholder_regex().captures_iter(pattern) {
        let whole = captures.get(0).expect("capture 0 always present");
        let key = &captures[1];
        rendered.push_text(&pattern[last..whole.start()]);

        match data.get(key) {
            Some(value) => rendered.push_text(value),
            None if word_regex().is_match(key) => {
                rendered.segments.push(Segment::Missing(key.to_string()))
            }
            None => rendered.push_text(whole.as_str()),
        }
        last = whole.end();
    }
    rendered.push_text(&pattern[last..]);

    rendered
}

pub fn preview(subject: &str, body: &str, data: &BTreeMap<String, String>) -> Preview {
    Preview {
        subject: render(subject, data),
        content: render(body, data),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
