use std::time::Duration;

use angebot_core::{Offer, OfferStore, SyncError};
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::classify::{classify_status, classify_transport};
use crate::config::SyncConfig;
use crate::retry::with_retry;

const SYSTEM: &str = "notion";
const NOTION_VERSION: &str = "2022-06-28";
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Document-database system of record: one Notion page per offer, keyed by
/// an "Offer ID" rich-text property. Human-readable properties are pushed
/// alongside a full JSON payload so a fetch round-trips every field.
pub struct NotionStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    database_id: String,
    retry_attempts: u32,
}

impl NotionStore {
    pub fn new(cfg: &SyncConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.notion.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.notion.api_key.clone(),
            database_id: cfg.notion.database_id.clone(),
            retry_attempts: cfg.http.retry_attempts,
        })
    }

    fn post(&self, url: String, payload: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(payload)
    }

    /// Query the database, following pagination cursors
    async fn query_pages(&self, filter: Option<&Value>) -> Result<Vec<Value>, SyncError> {
        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut payload = match filter {
                Some(f) => json!({ "filter": f }),
                None => json!({}),
            };
            if let Some(c) = &cursor {
                payload["start_cursor"] = json!(c);
            }

            let response = self
                .post(url.clone(), &payload)
                .send()
                .await
                .map_err(|e| classify_transport(SYSTEM, &e))?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            classify_status(SYSTEM, status, &body)?;

            if body.trim().is_empty() {
                return Ok(pages);
            }
            let value: Value = serde_json::from_str(&body).map_err(|e| SyncError::Malformed {
                system: SYSTEM.to_string(),
                message: e.to_string(),
            })?;

            // `results` may be missing or empty; that is "no data"
            if let Some(results) = value.get("results").and_then(Value::as_array) {
                pages.extend(results.iter().cloned());
            }

            let has_more = value.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = value
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                return Ok(pages);
            }
        }
    }

    async fn find_page(&self, id: Uuid) -> Result<Option<Value>, SyncError> {
        let filter = json!({
            "property": "Offer ID",
            "rich_text": { "equals": id.to_string() }
        });
        let pages = self.query_pages(Some(&filter)).await?;
        Ok(pages.into_iter().next())
    }

    async fn try_upsert(&self, offer: &Offer) -> Result<(), SyncError> {
        let properties = build_properties(offer)?;

        // Page updates go through PATCH, creation through POST
        let request = match self.find_page(offer.id).await? {
            Some(page) => {
                let page_id = page
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SyncError::Malformed {
                        system: SYSTEM.to_string(),
                        message: "query result page without id".to_string(),
                    })?;
                self.client
                    .patch(format!("{}/pages/{}", self.base_url, page_id))
                    .bearer_auth(&self.api_key)
                    .header("Notion-Version", NOTION_VERSION)
                    .json(&json!({ "properties": properties }))
            }
            None => self.post(
                format!("{}/pages", self.base_url),
                &json!({
                    "parent": { "database_id": self.database_id },
                    "properties": properties,
                }),
            ),
        };

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(SYSTEM, &e))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_status(SYSTEM, status, &body)
    }
}

#[async_trait]
impl OfferStore for NotionStore {
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
        let page = with_retry(self.retry_attempts, RETRY_BASE_DELAY, || {
            self.find_page(id)
        })
        .await?;

        match page {
            Some(page) => offer_from_page(&page).map(Some),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Offer>, SyncError> {
        let pages = with_retry(self.retry_attempts, RETRY_BASE_DELAY, || {
            self.query_pages(None)
        })
        .await?;

        let mut offers = Vec::with_capacity(pages.len());
        for page in &pages {
            match offer_from_page(page) {
                Ok(offer) => offers.push(offer),
                Err(err) => {
                    tracing::warn!("skipping undecodable notion page: {err}");
                }
            }
        }
        Ok(offers)
    }
}

/// Build the Notion properties payload for an offer. Pure so the mapping is
/// testable without a server.
fn build_properties(offer: &Offer) -> Result<Value, SyncError> {
    let payload = serde_json::to_string(offer).map_err(|e| SyncError::Malformed {
        system: SYSTEM.to_string(),
        message: e.to_string(),
    })?;

    let title = offer
        .kunde
        .clone()
        .unwrap_or_else(|| "Unbenanntes Angebot".to_string());

    let mut properties = json!({
        "Name": { "title": [{ "text": { "content": title } }] },
        "Status": { "select": { "name": offer.state.to_string() } },
        "Offer ID": { "rich_text": [{ "text": { "content": offer.id.to_string() } }] },
        "Payload": { "rich_text": [{ "text": { "content": payload } }] },
    });

    if let Some(datum) = offer.schulung_datum {
        properties["Schulungsdatum"] = json!({ "date": { "start": datum.to_string() } });
    }
    if let Some(datum) = offer.erinnerung_datum {
        properties["Erinnerung"] = json!({ "date": { "start": datum.to_string() } });
    }
    if let Some(trainer) = &offer.trainer_name {
        properties["Trainer"] = json!({ "rich_text": [{ "text": { "content": trainer } }] });
    }
    if let Some(betrag) = offer.betrag {
        properties["Betrag"] = json!({ "number": betrag });
    }

    Ok(properties)
}

/// Decode an offer from a page's payload property. Presence-checked at
/// every step; a page without the property is malformed, not a panic.
fn offer_from_page(page: &Value) -> Result<Offer, SyncError> {
    let content = page
        .get("properties")
        .and_then(|p| p.get("Payload"))
        .and_then(|p| p.get("rich_text"))
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(|t| t.get("text"))
        .and_then(|t| t.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::Malformed {
            system: SYSTEM.to_string(),
            message: "page has no payload property".to_string(),
        })?;

    serde_json::from_str(content).map_err(|e| SyncError::Malformed {
        system: SYSTEM.to_string(),
        message: e.to_string(),
    })
}
