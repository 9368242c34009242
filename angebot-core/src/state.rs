use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::OfferError;
use crate::model::{HistoryEntry, Offer, OfferState};

/// User- or time-driven action against an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferAction {
    Send,
    Remind,
    Accept,
    Decline,
    Expire,
}

impl fmt::Display for OfferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OfferAction::Send => "send",
            OfferAction::Remind => "remind",
            OfferAction::Accept => "accept",
            OfferAction::Decline => "decline",
            OfferAction::Expire => "expire",
        };
        f.write_str(s)
    }
}

impl FromStr for OfferAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(OfferAction::Send),
            "remind" => Ok(OfferAction::Remind),
            "accept" => Ok(OfferAction::Accept),
            "decline" => Ok(OfferAction::Decline),
            "expire" => Ok(OfferAction::Expire),
            other => Err(format!(
                "unknown action '{other}' (expected send, remind, accept, decline or expire)"
            )),
        }
    }
}

/// The transition table. No implicit reverse edges; terminal states have
/// no outgoing edges at all.
fn next_state(state: OfferState, action: OfferAction) -> Option<OfferState> {
    use OfferAction::*;
    use OfferState::*;

    match (state, action) {
        (Draft, Send) => Some(Sent),
        (Sent, Remind) => Some(Reminded),
        (Sent, Accept) => Some(Accepted),
        (Sent, Decline) => Some(Declined),
        (Sent, Expire) => Some(Expired),
        // Re-entrant: repeated reminders are allowed
        (Reminded, Remind) => Some(Reminded),
        (Reminded, Accept) => Some(Accepted),
        (Reminded, Decline) => Some(Declined),
        (Reminded, Expire) => Some(Expired),
        _ => None,
    }
}

/// Whether `action` is defined for the current state
pub fn allows(state: OfferState, action: OfferAction) -> bool {
    next_state(state, action).is_some()
}

/// Apply `action` to the offer: new state plus an appended history entry,
/// or `InvalidTransition`. Pure; wall-clock time is injected by the caller.
pub fn transition(
    mut offer: Offer,
    action: OfferAction,
    now: DateTime<Utc>,
) -> Result<Offer, OfferError> {
    let next = next_state(offer.state, action).ok_or(OfferError::InvalidTransition {
        state: offer.state,
        action,
    })?;

    offer.state = next;
    offer.history.push(HistoryEntry { state: next, at: now });
    offer.updated_at = now;
    Ok(offer)
}
