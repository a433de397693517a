//! Application data and step completion payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::Step;
use crate::otp::PhoneNumber;
use crate::pan::PanNumber;
use crate::uploads::ImageRef;

/// Verified fields of one onboarding attempt.
///
/// Only the orchestrator writes to it, and only by merging a
/// [`PartialApplicationData`]. Flags never go back to false.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationData {
    pub(super) pan_verified: bool,
    pub(super) face_verified: bool,
    pub(super) phone_verified: bool,
    pub(super) pan_number: Option<PanNumber>,
    pub(super) phone_number: Option<PhoneNumber>,
    pub(super) pan_image: Option<ImageRef>,
}

impl ApplicationData {
    pub fn pan_verified(&self) -> bool {
        self.pan_verified
    }

    pub fn face_verified(&self) -> bool {
        self.face_verified
    }

    pub fn phone_verified(&self) -> bool {
        self.phone_verified
    }

    pub fn pan_number(&self) -> Option<&PanNumber> {
        self.pan_number.as_ref()
    }

    pub fn phone_number(&self) -> Option<&PhoneNumber> {
        self.phone_number.as_ref()
    }

    /// The card image the face step compares against.
    pub fn pan_image(&self) -> Option<&ImageRef> {
        self.pan_image.as_ref()
    }

    /// All three verifications done.
    pub fn is_complete(&self) -> bool {
        self.pan_verified && self.face_verified && self.phone_verified
    }

    /// The active step, derived from the flags so it can never disagree
    /// with them.
    pub fn current_step(&self) -> Step {
        if !self.pan_verified {
            Step::Pan
        } else if !self.face_verified {
            Step::Face
        } else if !self.phone_verified {
            Step::Phone
        } else {
            Step::Summary
        }
    }
}

/// Fields a step hands back on success. Each variant carries exactly the
/// fields its step owns.
#[derive(Debug, Clone)]
pub enum PartialApplicationData {
    Pan {
        pan_number: PanNumber,
        pan_image: Option<ImageRef>,
    },
    Face,
    Phone {
        phone_number: PhoneNumber,
    },
}

impl PartialApplicationData {
    /// The step this payload completes.
    pub fn step(&self) -> Step {
        match self {
            Self::Pan { .. } => Step::Pan,
            Self::Face => Step::Face,
            Self::Phone { .. } => Step::Phone,
        }
    }
}

/// Overall application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    InProgress,
    Complete,
}

/// Finalized view of a completed application.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub status: ApplicationStatus,
    pub pan_number: PanNumber,
    pub phone_number: PhoneNumber,
    pub pan_verified: bool,
    pub face_verified: bool,
    pub phone_verified: bool,
    /// Long-form completion date shown to the applicant.
    pub application_date: String,
    pub completed_at: DateTime<Utc>,
}

/// Human-readable application date, e.g. "16 October 2026".
pub fn application_date(at: DateTime<Utc>) -> String {
    at.format("%-d %B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_data_starts_at_pan() {
        let data = ApplicationData::default();
        assert_eq!(data.current_step(), Step::Pan);
        assert!(!data.is_complete());
        assert!(data.pan_number().is_none());
        assert!(data.pan_image().is_none());
    }

    #[test]
    fn current_step_follows_flags() {
        let mut data = ApplicationData {
            pan_verified: true,
            ..Default::default()
        };
        assert_eq!(data.current_step(), Step::Face);
        data.face_verified = true;
        assert_eq!(data.current_step(), Step::Phone);
        data.phone_verified = true;
        assert_eq!(data.current_step(), Step::Summary);
        assert!(data.is_complete());
    }

    #[test]
    fn partial_reports_its_step() {
        let pan = PanNumber::parse("ABCDE1234F").unwrap();
        let phone = PhoneNumber::parse("9876543210").unwrap();
        assert_eq!(
            PartialApplicationData::Pan {
                pan_number: pan,
                pan_image: None
            }
            .step(),
            Step::Pan
        );
        assert_eq!(PartialApplicationData::Face.step(), Step::Face);
        assert_eq!(
            PartialApplicationData::Phone { phone_number: phone }.step(),
            Step::Phone
        );
    }

    #[test]
    fn data_serializes_camel_case() {
        let data = ApplicationData {
            pan_verified: true,
            pan_number: PanNumber::parse("ABCDE1234F"),
            pan_image: Some(ImageRef::new("/uploads/1-card.png")),
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["panVerified"], true);
        assert_eq!(json["faceVerified"], false);
        assert_eq!(json["panNumber"], "ABCDE1234F");
        assert_eq!(json["panImage"], "1-card.png");
        assert!(json["phoneNumber"].is_null());
    }

    #[test]
    fn application_date_is_long_form() {
        let at: DateTime<Utc> = "2026-10-16T09:30:00Z".parse().unwrap();
        assert_eq!(application_date(at), "16 October 2026");
        let at: DateTime<Utc> = "2027-03-05T23:59:00Z".parse().unwrap();
        assert_eq!(application_date(at), "5 March 2027");
    }
}
