use std::collections::HashMap;
use std::time::Duration;

use angebot_core::model::{HistoryEntry, OfferSource, OfferState};
use angebot_core::{Offer, OfferStore, SyncError, SyncState};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::{classify_status, classify_transport};
use crate::config::SyncConfig;
use crate::retry::with_retry;

const SYSTEM: &str = "supabase";
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Relational system of record, reached over the Supabase PostgREST API
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    retry_attempts: u32,
}

/// Flat row shape of the `angebote` table. History and sync status live in
/// jsonb columns so a fetch returns the offer with full fidelity.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OfferRow {
    id: Uuid,
    status: OfferState,
    kunde: Option<String>,
    leistung: Option<String>,
    betrag: Option<f64>,
    trainer_name: Option<String>,
    schulung_datum: Option<NaiveDate>,
    erinnerung_datum: Option<NaiveDate>,
    notizen: Option<String>,
    source: OfferSource,
    history: Vec<HistoryEntry>,
    sync_status: HashMap<String, SyncState>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Offer> for OfferRow {
    fn from(offer: &Offer) -> Self {
        OfferRow {
            id: offer.id,
            status: offer.state,
            kunde: offer.kunde.clone(),
            leistung: offer.leistung.clone(),
            betrag: offer.betrag,
            trainer_name: offer.trainer_name.clone(),
            schulung_datum: offer.schulung_datum,
            erinnerung_datum: offer.erinnerung_datum,
            notizen: offer.notizen.clone(),
            source: offer.source,
            history: offer.history.clone(),
            sync_status: offer.sync_status.clone(),
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        Offer {
            id: row.id,
            state: row.status,
            history: row.history,
            kunde: row.kunde,
            leistung: row.leistung,
            betrag: row.betrag,
            trainer_name: row.trainer_name,
            schulung_datum: row.schulung_datum,
            erinnerung_datum: row.erinnerung_datum,
            notizen: row.notizen,
            source: row.source,
            sync_status: row.sync_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl SupabaseStore {
    pub fn new(cfg: &SyncConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.supabase.url.trim_end_matches('/').to_string(),
            api_key: cfg.supabase.api_key.clone(),
            table: cfg.supabase.table.clone(),
            retry_attempts: cfg.http.retry_attempts,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    async fn try_upsert(&self, offer: &Offer) -> Result<(), SyncError> {
        let row = OfferRow::from(offer);
        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .query(&[("on_conflict", "id")])
            .json(&row)
            .send()
            .await
            .map_err(|e| classify_transport(SYSTEM, &e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_status(SYSTEM, status, &body)
    }

    async fn get_rows(&self, query: &[(&str, String)]) -> Result<Vec<OfferRow>, SyncError> {
        let response = self
            .client
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| classify_transport(SYSTEM, &e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_status(SYSTEM, status, &body)?;

        // A successful response with no body is "no data", not a fault
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|e| SyncError::Malformed {
            system: SYSTEM.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl OfferStore for SupabaseStore {
    fn system(&self) -> &'static str {
        SYSTEM
    }

    async fn upsert(&self, offer: &Offer) -> Result<(), SyncError> {
        with_retry(self.retry_attempts, RETRY_BASE_DELAY, || {
            self.try_upsert(offer)
        })
        .await
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Offer>, SyncError> {
        let query = [
            ("id", format!("eq.{id}")),
            ("select", "*".to_string()),
        ];
        let rows = with_retry(self.retry_attempts, RETRY_BASE_DELAY, || {
            self.get_rows(&query)
        })
        .await?;

        Ok(rows.into_iter().next().map(Offer::from))
    }

    async fn list(&self) -> Result<Vec<Offer>, SyncError> {
        let query = [
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        let rows = with_retry(self.retry_attempts, RETRY_BASE_DELAY, || {
            self.get_rows(&query)
        })
        .await?;

        Ok(rows.into_iter().map(Offer::from).collect())
    }
}
