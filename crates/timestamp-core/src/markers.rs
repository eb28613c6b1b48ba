//! Timestamp and video markers embedded in notes.
//!
//! Three shapes are recognised:
//! - a fenced `timestamp` block, one marker per line
//! - a fenced `timestamp-url` block holding a label line and a locator line
//! - an inline code span `` `:vts=mm:ss` ``

use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use regex::Regex;
use timestamp_types::Settings;

use crate::error::MediaError;
use crate::locator::Locator;
use crate::registry::PlayerRegistry;
use crate::timestamp;

pub const TIMESTAMP_BLOCK: &str = "timestamp";
pub const VIDEO_BLOCK: &str = "timestamp-url";
pub const INLINE_PREFIX: &str = ":vts=";

/// Colors applied to a rendered marker button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonStyle {
    pub background: String,
    pub text: String,
}

impl ButtonStyle {
    pub fn timestamp(settings: &Settings) -> Self {
        Self {
            background: settings.timestamp_color.clone(),
            text: settings.timestamp_text_color.clone(),
        }
    }

    pub fn video(settings: &Settings) -> Self {
        Self {
            background: settings.url_color.clone(),
            text: settings.url_text_color.clone(),
        }
    }
}

/// A clickable position in the active video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampMarker {
    /// Text shown on the button, as written in the note.
    pub label: String,
    pub seconds: u64,
}

impl TimestampMarker {
    fn parse(label: &str) -> Result<Self, MediaError> {
        Ok(Self {
            label: label.to_string(),
            seconds: timestamp::decode(label)?,
        })
    }

    /// Seek the bound player here; does nothing while no player is bound.
    pub fn seek(&self, registry: &mut PlayerRegistry) {
        registry.seek_to(self.seconds as f64);
    }
}

/// A button that opens a player on `locator`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoMarker {
    pub label: String,
    pub locator: Locator,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    Timestamp(TimestampMarker),
    Video(VideoMarker),
}

fn timestamp_pattern() -> &'static Regex {
    static RE_TIMESTAMP: OnceLock<Regex> = OnceLock::new();
    RE_TIMESTAMP.get_or_init(|| Regex::new(r"\d+:\d+:\d+|\d+:\d+").expect("static pattern"))
}

/// Markers in the body of a `timestamp` block.
///
/// Each non-empty line contributes its first timestamp-looking match; lines
/// without one are skipped.
pub fn parse_timestamp_block(source: &str) -> Vec<TimestampMarker> {
    source
        .split('\n')
        .filter(|row| !row.is_empty())
        .filter_map(|row| timestamp_pattern().find(row))
        .filter_map(|found| match TimestampMarker::parse(found.as_str()) {
            Ok(marker) => Some(marker),
            Err(err) => {
                tracing::debug!(error = %err, "skipping timestamp row");
                None
            }
        })
        .collect()
}

/// The video button described by a `timestamp-url` block.
///
/// The trimmed body must be exactly two lines: label then locator.
pub fn parse_video_block(source: &str) -> Option<VideoMarker> {
    let lines: Vec<&str> = source.trim().split('\n').collect();
    let [label, locator] = lines.as_slice() else {
        return None;
    };
    Some(VideoMarker {
        label: label.trim().to_string(),
        locator: Locator::from_canonical(locator.trim()),
    })
}

/// An inline `:vts=` code span.
pub fn parse_inline(code: &str) -> Option<TimestampMarker> {
    let time = code.trim().strip_prefix(INLINE_PREFIX)?;
    TimestampMarker::parse(time.trim()).ok()
}

/// Every marker in a markdown document, in document order.
pub fn scan_document(markdown: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut block: Option<(String, String)> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let lang = info.split_whitespace().next().unwrap_or_default();
                block = Some((lang.to_string(), String::new()));
            }
            Event::Text(text) => {
                if let Some((_, body)) = block.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                let Some((lang, body)) = block.take() else {
                    continue;
                };
                match lang.as_str() {
                    TIMESTAMP_BLOCK => markers.extend(
                        parse_timestamp_block(&body)
                            .into_iter()
                            .map(Marker::Timestamp),
                    ),
                    VIDEO_BLOCK => markers.extend(parse_video_block(&body).map(Marker::Video)),
                    _ => {}
                }
            }
            Event::Code(code) => {
                markers.extend(parse_inline(&code).map(Marker::Timestamp));
            }
            _ => {}
        }
    }
    markers
}

/// Fenced `timestamp` block holding `time`.
pub fn timestamp_block(time: &str) -> String {
    format!("```{TIMESTAMP_BLOCK} \n {time}\n```\n")
}

/// Inline `:vts=` code span for `time`.
pub fn inline_timestamp(time: &str) -> String {
    format!("`{INLINE_PREFIX}{time}`")
}

/// Fenced `timestamp-url` block for a labelled locator.
pub fn video_block(label: &str, locator: &str) -> String {
    format!("```{VIDEO_BLOCK} \n{label}\n{locator}\n```\n")
}
