//! Text formatting: deterministic cleanup of raw OCR output.
//!
//! Tesseract output for handwritten scans is noisy in two predictable ways:
//! ragged whitespace, and long runs of dots or underscores where the engine
//! saw pen strokes it could not read (or the form's blank lines). The rules
//! below normalise the first and replace the second with
//! [`UNREADABLE_SENTINEL`].
//!
//! ## Rule Order
//!
//! Rules run in a fixed order; later rules operate on the output of earlier
//! ones. In the default [`FormatMode::Collapse`] mode the whitespace rule also
//! folds the paragraph breaks the first rule just normalised, so a page comes
//! out as a single line. [`FormatMode::PreserveParagraphs`] keeps them.

use crate::config::FormatMode;
use crate::output::UNREADABLE_SENTINEL;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply the default formatting rules to raw OCR text.
///
/// Rules (applied in order):
/// 1. Collapse 3+ consecutive line breaks to exactly 2
/// 2. Collapse every whitespace run to a single space, then trim
/// 3. Replace runs of 2+ periods with the unreadable-text sentinel
/// 4. Replace runs of 2+ underscores with the same sentinel
///
/// Empty input yields an empty string.
pub fn format_text(raw: &str) -> String {
    format_text_with(raw, FormatMode::Collapse)
}

/// Apply the formatting rules for the given mode.
pub fn format_text_with(raw: &str, mode: FormatMode) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match mode {
        FormatMode::Collapse => {
            let s = collapse_line_breaks(raw);
            let s = collapse_whitespace(&s);
            let s = replace_dot_runs(&s);
            let s = replace_underscore_runs(&s);
            s.trim().to_string()
        }
        FormatMode::PreserveParagraphs => {
            let s = normalise_line_endings(raw);
            let s = collapse_horizontal_whitespace(&s);
            let s = trim_lines(&s);
            let s = collapse_line_breaks(&s);
            let s = replace_dot_runs(&s);
            let s = replace_underscore_runs(&s);
            s.trim().to_string()
        }
    }
}

// ── Rule 1: Collapse excessive line breaks ───────────────────────────────────

static RE_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_line_breaks(input: &str) -> String {
    RE_LINE_BREAKS.replace_all(input, "\n\n").into_owned()
}

// ── Rule 2: Collapse whitespace ──────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").trim().to_string()
}

// ── Rule 3: Dot runs ─────────────────────────────────────────────────────────

static RE_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

fn replace_dot_runs(input: &str) -> String {
    RE_DOTS
        .replace_all(input, regex::NoExpand(UNREADABLE_SENTINEL))
        .into_owned()
}

// ── Rule 4: Underscore runs ──────────────────────────────────────────────────

static RE_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

fn replace_underscore_runs(input: &str) -> String {
    RE_UNDERSCORES
        .replace_all(input, regex::NoExpand(UNREADABLE_SENTINEL))
        .into_owned()
}

// ── Paragraph mode helpers ───────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HORIZONTAL_WS.replace_all(input, " ").into_owned()
}

fn trim_lines(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(format_text(""), "");
        assert_eq!(format_text_with("", FormatMode::PreserveParagraphs), "");
    }

    #[test]
    fn test_whitespace_only_input() {
        assert_eq!(format_text(" \n\t\n "), "");
    }

    #[test]
    fn test_dot_run_becomes_sentinel() {
        let out = format_text("a...b");
        assert_eq!(out, format!("a{UNREADABLE_SENTINEL}b"));
        assert!(!out.contains("..."));
    }

    #[test]
    fn test_single_dot_kept() {
        assert_eq!(format_text("Fin. Nuevo"), "Fin. Nuevo");
    }

    #[test]
    fn test_underscore_run_becomes_sentinel() {
        assert_eq!(
            format_text("Nombre: ______"),
            format!("Nombre: {UNREADABLE_SENTINEL}")
        );
        assert_eq!(format_text("snake_case"), "snake_case");
    }

    #[test]
    fn test_collapse_line_breaks_rule() {
        assert_eq!(collapse_line_breaks("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_line_breaks("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_default_mode_folds_paragraphs() {
        assert_eq!(format_text("uno\n\n\n\ndos\n tres  "), "uno dos tres");
    }

    #[test]
    fn test_paragraph_mode_keeps_breaks() {
        let out = format_text_with("uno  \r\n\r\n\r\n\r\n  dos\tx\n tres", FormatMode::PreserveParagraphs);
        assert_eq!(out, "uno\n\ndos x\ntres");
    }

    #[test]
    fn test_paragraph_mode_blank_lines_with_spaces() {
        let out = format_text_with("a\n \n \n \nb", FormatMode::PreserveParagraphs);
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn test_paragraph_mode_sentinels() {
        let out = format_text_with("Firma: ....\n\n\n____", FormatMode::PreserveParagraphs);
        assert_eq!(
            out,
            format!("Firma: {UNREADABLE_SENTINEL}\n\n{UNREADABLE_SENTINEL}")
        );
    }
}
