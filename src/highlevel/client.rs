//! API client for the HighLevel (LeadConnector) REST API.
//!
//! This module provides the `ApiClient` struct for paging through a
//! location's contacts and narrowing them to recent, sale-tagged ones.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use tracing::{debug, info, warn};

use crate::config::{Config, LocationConfig};
use crate::models::{Contact, ContactsPage};

use super::{ApiError, PageGuard, PageStep, StopReason};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the LeadConnector API
const API_BASE_URL: &str = "https://services.leadconnectorhq.com";

/// API version header value; the contacts endpoint requires it.
const API_VERSION: &str = "2021-07-28";

/// Contacts requested per page.
/// 100 is the maximum the listing endpoint accepts.
const PAGE_SIZE: u32 = 100;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while still failing within a cron slot.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Pause between consecutive page requests in milliseconds.
/// Keeps a multi-page fetch under the provider's burst limit.
const PAGE_DELAY_MS: u64 = 100;

/// Backoff after a 429 in seconds.
/// The provider's rate window is one minute, so shorter retries just burn
/// requests.
const RATE_LIMIT_BACKOFF_SECS: u64 = 60;

/// API client for HighLevel.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    sale_tag: String,
    search_query: Option<String>,
    max_pages: u32,
    dup_threshold: usize,
}

impl ApiClient {
    /// Create a new API client from the run configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            sale_tag: config.sale_tag.clone(),
            search_query: config.search_query.clone(),
            max_pages: config.fetch.max_pages,
            dup_threshold: config.fetch.dup_threshold,
        })
    }

    /// Page through one location's contacts and keep those that are
    /// sale-tagged and added on or after `since`.
    ///
    /// Mid-fetch request failures are logged and end the location's
    /// pagination; contacts collected up to that point are still returned.
    pub async fn fetch_sales_contacts(
        &self,
        location: &LocationConfig,
        api_key: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Contact>> {
        let headers = Self::auth_headers(api_key)?;
        let mut guard = PageGuard::new(self.max_pages, self.dup_threshold);
        let mut matched: Vec<Contact> = Vec::new();

        info!(
            location = %location.name,
            since = %since.format("%Y-%m-%d"),
            "Fetching sales contacts"
        );

        loop {
            let page = match self.contacts_page(&headers, &location.id, guard.cursor()).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        location = %location.name,
                        error = %err,
                        "Fetch aborted mid-pagination, keeping partial results"
                    );
                    break;
                }
            };

            if guard.pages_seen() == 0 {
                if let Some(total) = page.meta.as_ref().and_then(|m| m.total) {
                    debug!(location = %location.name, total, "Server reports total contacts");
                }
            }

            let ids: Vec<&str> = page.contacts.iter().map(|c| c.id.as_str()).collect();
            match guard.step(&ids) {
                PageStep::Reject(StopReason::Exhausted) => break,
                PageStep::Reject(reason) => {
                    info!(location = %location.name, reason = %reason, "Stopping pagination");
                    break;
                }
                PageStep::Last(reason) => {
                    self.keep_matching(&mut matched, page, since);
                    info!(location = %location.name, reason = %reason, "Stopping pagination");
                    break;
                }
                PageStep::Continue(_) => {
                    self.keep_matching(&mut matched, page, since);
                }
            }

            tokio::time::sleep(Duration::from_millis(PAGE_DELAY_MS)).await;
        }

        info!(
            location = %location.name,
            matched = matched.len(),
            pages = guard.pages_seen(),
            "Fetch complete"
        );
        Ok(matched)
    }

    fn keep_matching(&self, matched: &mut Vec<Contact>, page: ContactsPage, since: DateTime<Utc>) {
        let kept_before = matched.len();
        matched.extend(
            page.contacts
                .into_iter()
                .filter(|contact| self.matches_filter(contact, since)),
        );
        debug!(kept = matched.len() - kept_before, "Page processed");
    }

    /// Whether a contact belongs in the export: sale-tagged and added on or
    /// after the window start. Contacts with no parseable timestamp are
    /// dropped.
    fn matches_filter(&self, contact: &Contact, since: DateTime<Utc>) -> bool {
        contact.has_tag(&self.sale_tag)
            && contact
                .signup_time()
                .map(|added| added >= since)
                .unwrap_or(false)
    }

    /// Fetch one page, retrying in place on 429 so pagination state is
    /// untouched by rate limiting.
    async fn contacts_page(
        &self,
        headers: &header::HeaderMap,
        location_id: &str,
        cursor: Option<&str>,
    ) -> Result<ContactsPage, ApiError> {
        let url = format!("{}/contacts/", API_BASE_URL);

        let mut params: Vec<(&str, String)> = vec![
            ("locationId", location_id.to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("startAfterId", cursor.to_string()));
        }
        if let Some(query) = &self.search_query {
            params.push(("query", query.clone()));
        }

        loop {
            let response = self
                .client
                .get(&url)
                .headers(headers.clone())
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let err = ApiError::from_status(status, &body);
                if err.is_rate_limit() {
                    warn!(
                        location = location_id,
                        backoff_secs = RATE_LIMIT_BACKOFF_SECS,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(Duration::from_secs(RATE_LIMIT_BACKOFF_SECS)).await;
                    continue;
                }
                return Err(err);
            }

            return response.json::<ContactsPage>().await.map_err(ApiError::from);
        }
    }

    fn auth_headers(api_key: &str) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("API key contains characters not valid in a header")?,
        );
        headers.insert("Version", header::HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }
}
