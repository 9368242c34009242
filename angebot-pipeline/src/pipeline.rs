use std::collections::HashMap;
use std::sync::Arc;

use angebot_core::{
    is_expired, is_reminder_due, state, transition, CollabError, ContractRenderer, Extractor,
    IntakeRecord, Offer, OfferAction, OfferError, OfferSource, OfferState, OfferStore, SyncError,
    SyncState,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Failures surfaced by pipeline operations. Sync failures of the upsert
/// fan-out never appear here; they are downgraded to per-system status
/// flags so a broken external system cannot block local work.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Offer(#[from] OfferError),

    #[error(transparent)]
    Collab(#[from] CollabError),

    /// Every store failed while resolving an offer for a read
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("contract requires an accepted offer, {id} is {state}")]
    NotAccepted { id: Uuid, state: OfferState },
}

/// Per-system outcome of one sync fan-out, in store order
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub systems: Vec<(String, SyncState)>,
}

impl SyncReport {
    pub fn fully_synced(&self) -> bool {
        self.systems.iter().all(|(_, s)| s.is_synced())
    }

    pub fn status(&self, system: &str) -> Option<&SyncState> {
        self.systems
            .iter()
            .find(|(name, _)| name == system)
            .map(|(_, s)| s)
    }
}

#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub offer: Offer,
    pub sync: SyncReport,
    /// Optional fields that were absent in the input. Informational, never
    /// an error.
    pub missing_fields: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub offer: Offer,
    pub sync: SyncReport,
}

/// What one `tick` invocation did
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub reminded: Vec<Uuid>,
    pub expired: Vec<Uuid>,
    pub failed: Vec<Uuid>,
}

/// Orchestrates the offer lifecycle: validation and state transitions
/// happen locally first, then the result is fanned out to every system of
/// record independently. The local cache is the source of truth within a
/// session; stores are listed in authoritative order (relational first) for
/// resumed reads.
pub struct OfferPipeline {
    stores: Vec<Arc<dyn OfferStore>>,
    offers: HashMap<Uuid, Offer>,
}

impl OfferPipeline {
    pub fn new(stores: Vec<Arc<dyn OfferStore>>) -> Self {
        Self {
            stores,
            offers: HashMap::new(),
        }
    }

    pub fn offer(&self, id: &Uuid) -> Option<&Offer> {
        self.offers.get(id)
    }

    pub fn offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.values()
    }

    /// Create a DRAFT offer from a raw record and sync it out. Absent
    /// optional fields are surfaced as flags; only unparsable input fails.
    pub async fn intake(
        &mut self,
        record: IntakeRecord,
        source: OfferSource,
        now: DateTime<Utc>,
    ) -> Result<IntakeOutcome, PipelineError> {
        let (mut offer, missing_fields) = Offer::from_intake(record, source, now)?;
        tracing::info!(id = %offer.id, ?source, "offer created");

        let sync = self.sync_all(&mut offer).await;
        self.offers.insert(offer.id, offer.clone());

        Ok(IntakeOutcome {
            offer,
            sync,
            missing_fields,
        })
    }

    /// Intake via the extraction collaborator. The returned record's fields
    /// are treated as genuinely optional.
    pub async fn intake_extracted(
        &mut self,
        extractor: &dyn Extractor,
        raw_text: &str,
        now: DateTime<Utc>,
    ) -> Result<IntakeOutcome, PipelineError> {
        let record = extractor.extract(raw_text).await?;
        self.intake(record, OfferSource::Extracted, now).await
    }

    /// Apply a lifecycle action. The local transition commits first; a sync
    /// failure afterwards is recorded per system, never rolled back.
    pub async fn apply_action(
        &mut self,
        id: Uuid,
        action: OfferAction,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, PipelineError> {
        let offer = match self.load(id).await? {
            Some(offer) => offer,
            None => return Err(OfferError::NotFound(id).into()),
        };

        let mut offer = transition(offer, action, now)?;
        tracing::info!(%id, %action, state = %offer.state, "transition applied");

        let sync = self.sync_all(&mut offer).await;
        self.offers.insert(id, offer.clone());

        Ok(ActionOutcome { offer, sync })
    }

    /// Evaluate time-based triggers for every tracked offer. Safe to
    /// re-invoke: reminders are deduplicated per calendar day and expiry is
    /// only applied where the transition is legal.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let due: Vec<(Uuid, OfferAction)> = self
            .offers
            .values()
            .filter_map(|offer| {
                if is_reminder_due(offer, now) {
                    Some((offer.id, OfferAction::Remind))
                } else if is_expired(offer, now) && state::allows(offer.state, OfferAction::Expire)
                {
                    Some((offer.id, OfferAction::Expire))
                } else {
                    None
                }
            })
            .collect();

        let mut report = TickReport::default();
        for (id, action) in due {
            match self.apply_action(id, action, now).await {
                Ok(_) => match action {
                    OfferAction::Remind => report.reminded.push(id),
                    OfferAction::Expire => report.expired.push(id),
                    _ => {}
                },
                Err(err) => {
                    tracing::error!(%id, %action, "tick action failed: {err}");
                    report.failed.push(id);
                }
            }
        }
        report
    }

    /// Render the contract document for an accepted offer
    pub fn contract(
        &self,
        id: Uuid,
        renderer: &dyn ContractRenderer,
    ) -> Result<Vec<u8>, PipelineError> {
        let offer = self.offers.get(&id).ok_or(OfferError::NotFound(id))?;
        if offer.state != OfferState::Accepted {
            return Err(PipelineError::NotAccepted {
                id,
                state: offer.state,
            });
        }
        Ok(renderer.render(offer)?)
    }

    /// Resolve an offer: cache first, then the stores in authoritative
    /// order. `Ok(None)` means no system knows the id; an error means every
    /// store failed before any could answer.
    pub async fn load(&mut self, id: Uuid) -> Result<Option<Offer>, SyncError> {
        if let Some(offer) = self.offers.get(&id) {
            return Ok(Some(offer.clone()));
        }

        let mut first_error = None;
        let mut any_answered = false;
        for store in &self.stores {
            match store.fetch(id).await {
                Ok(Some(offer)) => {
                    self.offers.insert(id, offer.clone());
                    return Ok(Some(offer));
                }
                Ok(None) => any_answered = true,
                Err(err) => {
                    tracing::warn!(system = store.system(), %id, "fetch failed: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            // Only an error if no store could answer at all; a store's
            // explicit "not found" is authoritative
            Some(err) if !any_answered => Err(err),
            _ => Ok(None),
        }
    }

    /// Pull every offer from the authoritative store into the local cache
    pub async fn refresh(&mut self) -> Result<usize, SyncError> {
        let Some(primary) = self.stores.first() else {
            return Ok(0);
        };

        let offers = primary.list().await?;
        let count = offers.len();
        for offer in offers {
            self.offers.insert(offer.id, offer);
        }
        tracing::info!(count, system = primary.system(), "cache refreshed");
        Ok(count)
    }

    /// Upsert to every system independently. One system's failure is
    /// recorded in its own `sync_status` entry and never blocks another's
    /// success; nothing escapes to the caller.
    async fn sync_all(&self, offer: &mut Offer) -> SyncReport {
        let mut systems = Vec::with_capacity(self.stores.len());

        for store in &self.stores {
            offer.record_sync(store.system(), SyncState::Pending);
        }

        for store in &self.stores {
            let state = match store.upsert(offer).await {
                Ok(()) => SyncState::Synced,
                Err(err) => {
                    tracing::warn!(system = store.system(), id = %offer.id, "sync failed: {err}");
                    SyncState::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            offer.record_sync(store.system(), state.clone());
            systems.push((store.system().to_string(), state));
        }

        SyncReport { systems }
    }
}
