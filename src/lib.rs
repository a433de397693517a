//! KYC onboarding: PAN card, face and phone verification for bank account
//! opening.

pub mod api;
pub mod config;
pub mod error;
pub mod face;
pub mod ocr;
pub mod onboarding;
pub mod otp;
pub mod pan;
pub mod uploads;
