//! Row rendering
//!
//! Turns a [`GraphRow`] into a line of text split into styled spans. The
//! renderer knows nothing about colors or the terminal: each span carries a
//! [`StyleHint`] that the UI maps to its theme. Rendering is a pure function
//! of the row and the options, so rows can be rendered ahead of time and
//! cached.

use chrono::{DateTime, Utc};
use gittree_core::{CommitRecord, RefKind};
use std::fmt::Write;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::builder::{Glyph, GraphRow};

/// Character set used for graph glyphs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GlyphSet {
    #[default]
    Ascii,
    Unicode,
}

impl GlyphSet {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascii => Self::Unicode,
            Self::Unicode => Self::Ascii,
        }
    }

    pub fn glyph(self, glyph: Glyph) -> char {
        match self {
            Self::Ascii => match glyph {
                Glyph::None => ' ',
                Glyph::Vertical => '|',
                Glyph::Horizontal => '-',
                Glyph::Fork => '/',
                Glyph::Merge => '\\',
                Glyph::Commit => '*',
                Glyph::Boundary => '~',
            },
            Self::Unicode => match glyph {
                Glyph::None => ' ',
                Glyph::Vertical => '│',
                Glyph::Horizontal => '─',
                Glyph::Fork => '╱',
                Glyph::Merge => '╲',
                Glyph::Commit => '●',
                Glyph::Boundary => '⋯',
            },
        }
    }
}

/// How commit dates are printed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateStyle {
    /// "3 days ago"
    Relative,
    /// chrono strftime pattern
    Absolute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub glyphs: GlyphSet,
    pub dates: DateStyle,
    /// Maximum display width of the line; 0 means unlimited
    pub width: usize,
    /// Reference point for relative dates
    pub now: DateTime<Utc>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            glyphs: GlyphSet::Ascii,
            dates: DateStyle::Absolute("%Y-%m-%d %H:%M".to_string()),
            width: 0,
            now: Utc::now(),
        }
    }
}

/// What a span shows, for the UI to pick a style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleHint {
    /// Graph cell belonging to a lane
    Lane(usize),
    /// Commit marker of the commit HEAD points at
    Head,
    Hash,
    Author,
    Date,
    Ref(RefKind),
    Subject,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub hint: StyleHint,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, hint: StyleHint) -> Self {
        Self {
            text: text.into(),
            hint,
        }
    }
}

/// One rendered row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    /// The line without styling
    pub fn plain(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Display width in terminal columns
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| s.text.width()).sum()
    }

    /// Only the graph cells
    pub fn graph(&self) -> String {
        self.spans
            .iter()
            .filter(|s| matches!(s.hint, StyleHint::Lane(_) | StyleHint::Head))
            .map(|s| s.text.as_str())
            .collect()
    }

    fn push(&mut self, text: impl Into<String>, hint: StyleHint) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.spans.push(StyledSpan::new(text, hint));
    }

    /// Cut the line to at most `width` columns
    fn truncate(&mut self, width: usize) {
        let mut used = 0;
        let mut keep = 0;
        for span in &mut self.spans {
            let span_width = span.text.width();
            if used + span_width <= width {
                used += span_width;
                keep += 1;
                continue;
            }
            span.text = truncate_to_width(&span.text, width - used);
            if !span.text.is_empty() {
                keep += 1;
            }
            break;
        }
        self.spans.truncate(keep);
    }
}

/// Render `row` with graph columns for lanes `0..=max_lane_seen`, followed by
/// hash, author, date, ref badges and subject.
pub fn render_row(row: &GraphRow, max_lane_seen: usize, options: &RenderOptions) -> StyledLine {
    let mut line = StyledLine::default();
    let record = &row.record;

    let cells = row.cells(max_lane_seen + 1);
    for (lane, pair) in cells.chunks(2).enumerate() {
        let text: String = pair.iter().map(|g| options.glyphs.glyph(*g)).collect();
        let hint = if lane == row.lane && record.is_head() {
            StyleHint::Head
        } else {
            StyleHint::Lane(lane)
        };
        line.push(text, hint);
    }

    line.push(" ", StyleHint::Plain);
    line.push(record.short_id.clone(), StyleHint::Hash);
    if !record.author_name.is_empty() {
        line.push(" ", StyleHint::Plain);
        line.push(record.author_name.clone(), StyleHint::Author);
    }
    line.push(" ", StyleHint::Plain);
    line.push(format_date(record, &options.dates, options.now), StyleHint::Date);

    if !record.refs.is_empty() {
        line.push(" (", StyleHint::Plain);
        for (i, r) in record.refs.iter().enumerate() {
            if i > 0 {
                line.push(", ", StyleHint::Plain);
            }
            line.push(r.to_string(), StyleHint::Ref(r.kind));
        }
        line.push(")", StyleHint::Plain);
    }

    if !record.subject.is_empty() {
        line.push(" ", StyleHint::Plain);
        line.push(record.subject.clone(), StyleHint::Subject);
    }

    if options.width > 0 {
        line.truncate(options.width);
    }
    line
}

fn format_date(record: &CommitRecord, style: &DateStyle, now: DateTime<Utc>) -> String {
    match style {
        DateStyle::Relative => format_relative(record.author_time, now),
        DateStyle::Absolute(pattern) => format_absolute(record.author_time, pattern),
    }
}

/// Format with a strftime pattern. An unusable pattern falls back to
/// RFC 3339 instead of failing the frame.
fn format_absolute(time: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", time.format(pattern)).is_err() {
        return time.to_rfc3339();
    }
    out
}

/// "5 minutes ago", "3 days ago", "2 years ago"
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }
    if seconds < 60 {
        return "just now".to_string();
    }

    let (value, unit) = match seconds {
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 14 * 86_400 => (s / 86_400, "day"),
        s if s < 60 * 86_400 => (s / (7 * 86_400), "week"),
        s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
        s => (s / (365 * 86_400), "year"),
    };
    if value == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", value, unit)
    }
}

/// Longest prefix of `text` that fits in `width` columns
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}
