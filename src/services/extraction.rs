//! Result extraction from worker output.
//!
//! The worker prints free-form diagnostics and a result section bounded by
//! marker lines. The label is carried on a `🔍 Gemini says: <label>` line.
//! All knowledge of this text format lives here.

use std::sync::LazyLock;

use regex::Regex;

pub const RESULT_START_MARKER: &str = "=== RESULT START ===";
pub const RESULT_END_MARKER: &str = "=== RESULT END ===";

/// Markers printed around the raw API response by older worker scripts.
pub const LEGACY_START_MARKER: &str = "=== GEMINI API RESPONSE START ===";
pub const LEGACY_END_MARKER: &str = "=== GEMINI API RESPONSE END ===";

static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"🔍 Gemini says: (.+)").expect("label pattern is valid")
});

/// First label announced in `stdout`, trimmed. `None` if there is no label line
/// or the label is blank.
pub fn extract_label(stdout: &str) -> Option<String> {
    let captures = LABEL_LINE.captures(stdout)?;
    let label = captures.get(1)?.as_str().trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Position of a stdout line relative to the result section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLine {
    Start,
    End,
    Inside,
    Outside,
}

/// Tracks whether streamed stdout lines fall inside a result section.
/// Only used to shape log output.
#[derive(Debug, Default)]
pub struct SectionTracker {
    inside: bool,
}

impl SectionTracker {
    pub fn classify(&mut self, line: &str) -> SectionLine {
        if line.contains(RESULT_START_MARKER) || line.contains(LEGACY_START_MARKER) {
            self.inside = true;
            SectionLine::Start
        } else if line.contains(RESULT_END_MARKER) || line.contains(LEGACY_END_MARKER) {
            self.inside = false;
            SectionLine::End
        } else if self.inside {
            SectionLine::Inside
        } else {
            SectionLine::Outside
        }
    }
}
