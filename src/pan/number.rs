//! The validated PAN identifier.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Five uppercase letters, four digits, one uppercase letter.
static PAN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());

/// Boilerplate words printed on every card that must never be reported as a
/// PAN, compared against the normalized candidate.
const BLOCKLIST: &[&str] = &["INCOMETAX", "PERMANENT", "ACCOUNT", "NUMBER", "PAN"];

/// A 10-character PAN such as `ABCDE1234F`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PanNumber(String);

impl PanNumber {
    /// Exact manual-entry validation: the input must already be a well-formed
    /// PAN. No normalization or OCR correction is applied.
    pub fn parse(input: &str) -> Option<Self> {
        if is_valid(input) {
            Some(Self(input.to_string()))
        } else {
            None
        }
    }

    /// Accept an already-normalized OCR candidate if it has the PAN shape and
    /// is not a blocklisted boilerplate word.
    pub(crate) fn from_candidate(candidate: &str) -> Option<Self> {
        if is_blocklisted(candidate) {
            return None;
        }
        Self::parse(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether `input` matches `^[A-Z]{5}[0-9]{4}[A-Z]$` exactly.
pub fn is_valid(input: &str) -> bool {
    PAN_PATTERN.is_match(input)
}

fn is_blocklisted(candidate: &str) -> bool {
    BLOCKLIST.iter().any(|word| candidate.eq_ignore_ascii_case(word))
}

impl std::fmt::Display for PanNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PanNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(format!("invalid PAN number: {value:?}"))
        }
    }
}

impl From<PanNumber> for String {
    fn from(pan: PanNumber) -> Self {
        pan.0
    }
}
