use chrono::{DateTime, Utc};

use crate::model::{Offer, OfferState};

/// Whether a reminder action should fire now. Total: an absent
/// `erinnerung_datum` yields `false`, never an error. At most one reminder
/// per calendar day, derived from the append-only history.
pub fn is_reminder_due(offer: &Offer, now: DateTime<Utc>) -> bool {
    let Some(due) = offer.erinnerung_datum else {
        return false;
    };
    if !matches!(offer.state, OfferState::Sent | OfferState::Reminded) {
        return false;
    }

    let today = now.date_naive();
    if today < due {
        return false;
    }
    offer.last_reminded_on() != Some(today)
}

/// Whether the offer has outlived its training date. Absent `schulung_datum`
/// never triggers expiry; terminal offers never expire again.
pub fn is_expired(offer: &Offer, now: DateTime<Utc>) -> bool {
    match offer.schulung_datum {
        Some(datum) => !offer.state.is_terminal() && datum < now.date_naive(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HistoryEntry, IntakeRecord, OfferSource};
    use crate::state::{transition, OfferAction};
    use chrono::{Duration, TimeZone};

    fn sent_offer(now: DateTime<Utc>) -> Offer {
        let (offer, _) =
            Offer::from_intake(IntakeRecord::default(), OfferSource::Manual, now).unwrap();
        transition(offer, OfferAction::Send, now).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_absent_reminder_date_is_never_due() {
        let now = fixed_now();
        let offer = sent_offer(now);
        assert_eq!(offer.erinnerung_datum, None);
        assert!(!is_reminder_due(&offer, now));
        assert!(!is_reminder_due(&offer, now + Duration::days(3650)));
    }

    #[test]
    fn test_reminder_due_when_date_reached() {
        let now = fixed_now();
        let mut offer = sent_offer(now);
        offer.erinnerung_datum = Some((now - Duration::days(1)).date_naive());

        assert!(is_reminder_due(&offer, now));
        // Not due before the reminder date
        assert!(!is_reminder_due(&offer, now - Duration::days(2)));
    }

    #[test]
    fn test_reminder_deduplicated_per_day() {
        let now = fixed_now();
        let mut offer = sent_offer(now);
        offer.erinnerung_datum = Some(now.date_naive());
        assert!(is_reminder_due(&offer, now));

        let offer = transition(offer, OfferAction::Remind, now).unwrap();
        assert!(!is_reminder_due(&offer, now));
        assert!(!is_reminder_due(&offer, now + Duration::hours(5)));

        // A new calendar day re-arms the reminder
        assert!(is_reminder_due(&offer, now + Duration::days(1)));
    }

    #[test]
    fn test_reminder_only_in_sent_or_reminded() {
        let now = fixed_now();
        let (mut offer, _) =
            Offer::from_intake(IntakeRecord::default(), OfferSource::Manual, now).unwrap();
        offer.erinnerung_datum = Some(now.date_naive());
        assert!(!is_reminder_due(&offer, now)); // DRAFT

        let mut accepted = sent_offer(now);
        accepted.erinnerung_datum = Some(now.date_naive());
        let accepted = transition(accepted, OfferAction::Accept, now).unwrap();
        assert!(!is_reminder_due(&accepted, now));
    }

    #[test]
    fn test_expiry_requires_past_training_date() {
        let now = fixed_now();
        let mut offer = sent_offer(now);
        assert!(!is_expired(&offer, now)); // no date, no expiry

        offer.schulung_datum = Some(now.date_naive());
        assert!(!is_expired(&offer, now)); // today is not strictly past

        offer.schulung_datum = Some((now - Duration::days(1)).date_naive());
        assert!(is_expired(&offer, now));
    }

    #[test]
    fn test_terminal_offers_never_expire() {
        let now = fixed_now();
        let mut offer = sent_offer(now);
        offer.schulung_datum = Some((now - Duration::days(7)).date_naive());
        let offer = transition(offer, OfferAction::Decline, now).unwrap();
        assert!(!is_expired(&offer, now));
    }

    #[test]
    fn test_scheduler_ignores_history_noise() {
        // A reminder recorded yesterday does not suppress today's reminder
        let now = fixed_now();
        let mut offer = sent_offer(now);
        offer.erinnerung_datum = Some((now - Duration::days(5)).date_naive());
        offer.history.push(HistoryEntry {
            state: OfferState::Reminded,
            at: now - Duration::days(1),
        });
        offer.state = OfferState::Reminded;

        assert!(is_reminder_due(&offer, now));
    }
}
