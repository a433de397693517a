//! PAN extraction from raw OCR text.
//!
//! OCR output for a card is noisy: boilerplate headings, split tokens,
//! punctuation glued to the number and the occasional `5`/`S` or `0`/`O`
//! confusion. Extraction runs an ordered list of progressively looser
//! stages and stops at the first one that yields a PAN. Every stage scans
//! top-to-bottom and left-to-right and reports at most one candidate, so the
//! result is deterministic.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::number::PanNumber;

/// Length of a PAN.
const PAN_LEN: usize = 10;

/// Ten-character uppercase alphanumeric runs in a raw OCR line.
static RAW_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z0-9]{10}").unwrap());

/// The stage of the pipeline that produced a PAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    /// A 10-character run inside a single line.
    LineRun,
    /// A whitespace-separated word that is a PAN once punctuation is removed.
    LineWord,
    /// A window of the whole text with all separators removed.
    FullText,
    /// A window of the whole text after undoing `5`/`S` and `0`/`O` confusions.
    ConfusionCorrected,
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LineRun => "line_run",
            Self::LineWord => "line_word",
            Self::FullText => "full_text",
            Self::ConfusionCorrected => "confusion_corrected",
        };
        write!(f, "{s}")
    }
}

type Stage = fn(&str) -> Option<PanNumber>;

/// Stages in order of increasing permissiveness. Order is significant.
const PIPELINE: &[(ExtractionStage, Stage)] = &[
    (ExtractionStage::LineRun, from_line_runs),
    (ExtractionStage::LineWord, from_line_words),
    (ExtractionStage::FullText, from_full_text),
    (ExtractionStage::ConfusionCorrected, from_corrected_text),
];

/// Extract a PAN from OCR text, or `None` if every stage fails and the
/// caller has to fall back to manual entry.
pub fn extract_pan(text: &str) -> Option<PanNumber> {
    extract_pan_with_stage(text).map(|(pan, _)| pan)
}

/// Like [`extract_pan`], also reporting which stage matched.
pub fn extract_pan_with_stage(text: &str) -> Option<(PanNumber, ExtractionStage)> {
    PIPELINE.iter().find_map(|(stage, run)| {
        let pan = run(text)?;
        debug!(stage = %stage, pan = %pan, "PAN extracted");
        Some((pan, *stage))
    })
}

/// Strip everything but ASCII letters and digits, then upper-case.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn from_line_runs(text: &str) -> Option<PanNumber> {
    text.split('\n').find_map(|line| {
        RAW_RUN
            .find_iter(line)
            .find_map(|run| PanNumber::from_candidate(&normalize(run.as_str())))
    })
}

fn from_line_words(text: &str) -> Option<PanNumber> {
    text.split('\n').find_map(|line| {
        line.split_whitespace()
            .find_map(|word| PanNumber::from_candidate(&normalize(word)))
    })
}

fn from_full_text(text: &str) -> Option<PanNumber> {
    windows(&normalize(text)).find_map(PanNumber::from_candidate)
}

fn from_corrected_text(text: &str) -> Option<PanNumber> {
    windows(&normalize(text))
        .map(correct_confusions)
        .find_map(|fixed| PanNumber::from_candidate(&fixed))
}

/// Every PAN-length window of an ASCII string, left to right.
fn windows(normalized: &str) -> impl Iterator<Item = &str> {
    let count = normalized.len().saturating_sub(PAN_LEN - 1);
    (0..count).map(move |start| &normalized[start..start + PAN_LEN])
}

/// Swap the ambiguous OCR pairs toward what each position requires: letters
/// in positions 0-4 and 9, digits in positions 5-8.
fn correct_confusions(window: &str) -> String {
    window
        .char_indices()
        .map(|(i, c)| match (i, c) {
            (5..=8, 'S') => '5',
            (5..=8, 'O') => '0',
            (5..=8, _) => c,
            (_, '5') => 'S',
            (_, '0') => 'O',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Option<(String, ExtractionStage)> {
        extract_pan_with_stage(text).map(|(pan, stage)| (pan.to_string(), stage))
    }

    #[test]
    fn finds_pan_between_card_headings() {
        let text = "INCOME TAX DEPARTMENT\nABCDE1234F\nGOVT OF INDIA";
        assert_eq!(
            extract(text),
            Some(("ABCDE1234F".to_string(), ExtractionStage::LineRun))
        );
    }

    #[test]
    fn first_line_wins() {
        let text = "NAME\nFIRST1234A\nSECND5678B";
        assert_eq!(extract_pan(text).unwrap().as_str(), "FIRST1234A");
    }

    #[test]
    fn first_run_in_line_wins() {
        let text = "FIRST1234A SECND5678B";
        assert_eq!(extract_pan(text).unwrap().as_str(), "FIRST1234A");
    }

    #[test]
    fn punctuated_word_found_by_word_stage() {
        let text = "Permanent Account Number\nABCDE-1234F\nSignature";
        assert_eq!(
            extract(text),
            Some(("ABCDE1234F".to_string(), ExtractionStage::LineWord))
        );
    }

    #[test]
    fn lowercase_word_found_by_word_stage() {
        assert_eq!(
            extract("pan: abcde1234f"),
            Some(("ABCDE1234F".to_string(), ExtractionStage::LineWord))
        );
    }

    #[test]
    fn split_number_found_by_full_text_stage() {
        let text = "Permanent Account Number\nABCDE 1234F\n";
        assert_eq!(
            extract(text),
            Some(("ABCDE1234F".to_string(), ExtractionStage::FullText))
        );
    }

    #[test]
    fn number_glued_to_noise_found_by_full_text_stage() {
        // The leftmost raw run is "XXABCDE123", which consumes the start of
        // the real number, so only the sliding window sees it.
        assert_eq!(
            extract("XXABCDE1234F"),
            Some(("ABCDE1234F".to_string(), ExtractionStage::FullText))
        );
    }

    #[test]
    fn confusions_corrected_in_last_stage() {
        assert_eq!(
            extract("ABCDE12S4F"),
            Some(("ABCDE1254F".to_string(), ExtractionStage::ConfusionCorrected))
        );
        assert_eq!(
            extract("0BCDE1234F"),
            Some(("OBCDE1234F".to_string(), ExtractionStage::ConfusionCorrected))
        );
        assert_eq!(
            extract("ABCDE1O345"),
            Some(("ABCDE1034S".to_string(), ExtractionStage::ConfusionCorrected))
        );
    }

    #[test]
    fn stricter_stage_preferred_over_correction() {
        // Line 1 would only match after correction, line 2 matches as-is.
        let text = "ABCDE12S4F\nVWXYZ9876K";
        assert_eq!(
            extract(text),
            Some(("VWXYZ9876K".to_string(), ExtractionStage::LineRun))
        );
    }

    #[test]
    fn short_runs_are_not_found() {
        assert_eq!(extract_pan("ABCD1234\nWXYZ5678"), None);
        assert_eq!(extract_pan("GOVT OF INDIA\nDATE 01 01 1990"), None);
    }

    #[test]
    fn boilerplate_alone_is_not_found() {
        assert_eq!(extract_pan("INCOME TAX DEPARTMENT"), None);
        assert_eq!(extract_pan("PERMANENT ACCOUNT NUMBER\nPAN"), None);
    }

    #[test]
    fn empty_text_is_not_found() {
        assert_eq!(extract_pan(""), None);
        assert_eq!(extract_pan("\n\n   \n"), None);
    }

    #[test]
    fn normalize_strips_and_uppercases() {
        assert_eq!(normalize("ab-cd e.1/2"), "ABCDE12");
        assert_eq!(normalize("ÄBC"), "BC");
    }

    #[test]
    fn windows_cover_every_offset() {
        let all: Vec<&str> = windows("ABCDEFGHIJKL").collect();
        assert_eq!(all, vec!["ABCDEFGHIJ", "BCDEFGHIJK", "CDEFGHIJKL"]);
        assert_eq!(windows("SHORT").count(), 0);
    }
}
