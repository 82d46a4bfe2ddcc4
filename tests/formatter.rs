//! Property tests for the OCR text formatter.

use expapyrus::{format_text, format_text_with, FormatMode, UNREADABLE_SENTINEL};
use proptest::prelude::*;

/// OCR-ish noise: letters, spaces, tabs, line breaks, dots and underscores.
fn noisy_text() -> impl Strategy<Value = String> {
    "[ab .\n\t\r_]{0,80}"
}

proptest! {
    #[test]
    fn collapse_mode_is_idempotent(raw in noisy_text()) {
        let once = format_text(&raw);
        prop_assert_eq!(format_text(&once), once);
    }

    #[test]
    fn paragraph_mode_is_idempotent(raw in noisy_text()) {
        let once = format_text_with(&raw, FormatMode::PreserveParagraphs);
        prop_assert_eq!(format_text_with(&once, FormatMode::PreserveParagraphs), once);
    }

    #[test]
    fn no_runs_survive(raw in noisy_text()) {
        for mode in [FormatMode::Collapse, FormatMode::PreserveParagraphs] {
            let out = format_text_with(&raw, mode);
            prop_assert!(!out.contains(".."), "dot run in {:?}", out);
            prop_assert!(!out.contains("__"), "underscore run in {:?}", out);
            prop_assert!(!out.contains("\n\n\n"), "line-break run in {:?}", out);
            prop_assert!(!out.contains("  "), "double space in {:?}", out);
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }

    #[test]
    fn collapse_mode_is_single_line(raw in noisy_text()) {
        let out = format_text(&raw);
        prop_assert!(!out.contains('\n'));
        prop_assert!(!out.contains('\t'));
    }
}

#[test]
fn dots_between_words() {
    let out = format_text("a...b");
    assert!(out.contains(UNREADABLE_SENTINEL));
    assert!(!out.contains("..."));
}

#[test]
fn four_newlines_become_two_in_paragraph_mode() {
    assert_eq!(
        format_text_with("a\n\n\n\nb", FormatMode::PreserveParagraphs),
        "a\n\nb"
    );
    assert_eq!(format_text("a\n\n\n\nb"), "a b");
}

#[test]
fn handwritten_form_line() {
    let raw = "Nombre:  ____________\n\n\n\nFecha:  ..../..../....\n";
    let s = UNREADABLE_SENTINEL;
    assert_eq!(
        format_text(raw),
        format!("Nombre: {s} Fecha: {s}/{s}/{s}")
    );
}
