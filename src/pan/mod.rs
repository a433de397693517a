//! PAN (permanent account number) handling.
//!
//! `number` holds the validated identifier type and the manual-entry
//! validator; `extract` recovers a PAN from noisy OCR text.

pub mod extract;
pub mod number;

pub use extract::extract_pan;
pub use number::PanNumber;
