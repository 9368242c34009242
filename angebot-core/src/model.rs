use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OfferError;
use crate::sync::SyncState;

/// Lifecycle state of an offer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferState {
    Draft,
    Sent,
    Reminded,
    Accepted,
    Declined,
    Expired,
}

impl OfferState {
    /// Terminal states have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OfferState::Accepted | OfferState::Declined | OfferState::Expired
        )
    }
}

impl fmt::Display for OfferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OfferState::Draft => "DRAFT",
            OfferState::Sent => "SENT",
            OfferState::Reminded => "REMINDED",
            OfferState::Accepted => "ACCEPTED",
            OfferState::Declined => "DECLINED",
            OfferState::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// Provenance of an offer record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferSource {
    Manual,
    Extracted,
}

/// One entry of the append-only transition history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub state: OfferState,
    pub at: DateTime<Utc>,
}

/// A tracked training-engagement offer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: Uuid,
    pub state: OfferState,
    /// Append-only; seeded with the DRAFT entry at creation
    pub history: Vec<HistoryEntry>,
    pub kunde: Option<String>,
    pub leistung: Option<String>,
    pub betrag: Option<f64>,
    pub trainer_name: Option<String>,
    pub schulung_datum: Option<NaiveDate>,
    pub erinnerung_datum: Option<NaiveDate>,
    pub notizen: Option<String>,
    pub source: OfferSource,
    /// Per-external-system sync outcome, monotonically replaced
    pub sync_status: HashMap<String, SyncState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Build a DRAFT offer from a raw intake record. Absent optional fields
    /// are reported back as informational flags, never as errors; an
    /// unparsable date is a `ValidationError`.
    pub fn from_intake(
        record: IntakeRecord,
        source: OfferSource,
        now: DateTime<Utc>,
    ) -> Result<(Self, Vec<&'static str>), OfferError> {
        let schulung_datum = parse_optional_date("schulung_datum", record.schulung_datum.as_deref())?;
        let erinnerung_datum =
            parse_optional_date("erinnerung_datum", record.erinnerung_datum.as_deref())?;

        let kunde = normalize_text(record.kunde.as_deref());
        let leistung = normalize_text(record.leistung.as_deref());
        let trainer_name = normalize_text(record.trainer_name.as_deref());
        let notizen = normalize_text(record.notizen.as_deref());

        let mut missing = Vec::new();
        if kunde.is_none() {
            missing.push("kunde");
        }
        if leistung.is_none() {
            missing.push("leistung");
        }
        if record.betrag.is_none() {
            missing.push("betrag");
        }
        if trainer_name.is_none() {
            missing.push("trainer_name");
        }
        if schulung_datum.is_none() {
            missing.push("schulung_datum");
        }

        let offer = Offer {
            id: Uuid::new_v4(),
            state: OfferState::Draft,
            history: vec![HistoryEntry {
                state: OfferState::Draft,
                at: now,
            }],
            kunde,
            leistung,
            betrag: record.betrag,
            trainer_name,
            schulung_datum,
            erinnerung_datum,
            notizen,
            source,
            sync_status: HashMap::new(),
            created_at: now,
            updated_at: now,
        };

        Ok((offer, missing))
    }

    /// Replace the sync outcome for one external system. Entries are never
    /// deleted; a FAILED entry is only overwritten by a later attempt.
    pub fn record_sync(&mut self, system: &str, state: SyncState) {
        self.sync_status.insert(system.to_string(), state);
    }

    /// Calendar day of the most recent REMINDED history entry, if any
    pub fn last_reminded_on(&self) -> Option<NaiveDate> {
        self.history
            .iter()
            .rev()
            .find(|e| e.state == OfferState::Reminded)
            .map(|e| e.at.date_naive())
    }
}

/// Raw intake shape as produced by manual entry or the extraction
/// collaborator. Every field is genuinely optional; dates arrive as strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub kunde: Option<String>,
    pub leistung: Option<String>,
    pub betrag: Option<f64>,
    pub trainer_name: Option<String>,
    pub schulung_datum: Option<String>,
    pub erinnerung_datum: Option<String>,
    pub notizen: Option<String>,
}

/// Blank or whitespace-only input is equivalent to absent
pub fn normalize_text(value: Option<&str>) -> Option<String> {
    match value {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    }
}

/// Parse a calendar date from ISO `YYYY-MM-DD` or German `DD.MM.YYYY` input
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, OfferError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d.%m.%Y"))
        .map_err(|_| OfferError::Validation {
            field,
            message: format!("'{value}' is not a calendar date"),
        })
}

/// Total date parsing: absent or blank input is `None`, not an error
pub fn parse_optional_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, OfferError> {
    match normalize_text(value) {
        Some(s) => parse_date(field, &s).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_blank_is_absent() {
        assert_eq!(normalize_text(None), None);
        assert_eq!(normalize_text(Some("")), None);
        assert_eq!(normalize_text(Some("   ")), None);
        assert_eq!(normalize_text(Some(" Acme GmbH ")), Some("Acme GmbH".to_string()));
    }

    #[test]
    fn test_parse_date_formats() {
        let iso = parse_date("schulung_datum", "2026-03-15").unwrap();
        let german = parse_date("schulung_datum", "15.03.2026").unwrap();
        assert_eq!(iso, german);

        let err = parse_date("schulung_datum", "next tuesday").unwrap_err();
        assert!(matches!(err, OfferError::Validation { field: "schulung_datum", .. }));
    }

    #[test]
    fn test_parse_optional_date_blank_is_none() {
        assert_eq!(parse_optional_date("erinnerung_datum", None).unwrap(), None);
        assert_eq!(parse_optional_date("erinnerung_datum", Some("")).unwrap(), None);
    }

    #[test]
    fn test_intake_with_absent_fields_creates_draft() {
        // Scenario: blank trainer name and no training date must not fail
        let record = IntakeRecord {
            kunde: Some("Acme GmbH".to_string()),
            trainer_name: Some("".to_string()),
            schulung_datum: None,
            ..Default::default()
        };

        let (offer, missing) =
            Offer::from_intake(record, OfferSource::Manual, Utc::now()).unwrap();

        assert_eq!(offer.state, OfferState::Draft);
        assert_eq!(offer.history.len(), 1);
        assert_eq!(offer.trainer_name, None);
        assert_eq!(offer.schulung_datum, None);
        assert!(missing.contains(&"trainer_name"));
        assert!(missing.contains(&"schulung_datum"));
        assert!(!missing.contains(&"kunde"));
    }

    #[test]
    fn test_intake_rejects_garbage_date() {
        let record = IntakeRecord {
            schulung_datum: Some("soon".to_string()),
            ..Default::default()
        };
        let err = Offer::from_intake(record, OfferSource::Manual, Utc::now()).unwrap_err();
        assert!(matches!(err, OfferError::Validation { .. }));
    }

    #[test]
    fn test_last_reminded_on_reads_history() {
        let now = Utc::now();
        let (mut offer, _) =
            Offer::from_intake(IntakeRecord::default(), OfferSource::Manual, now).unwrap();
        assert_eq!(offer.last_reminded_on(), None);

        offer.history.push(HistoryEntry {
            state: OfferState::Reminded,
            at: now,
        });
        assert_eq!(offer.last_reminded_on(), Some(now.date_naive()));
    }
}
