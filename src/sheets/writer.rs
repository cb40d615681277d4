//! Writes flattened rows into the dashboard spreadsheet.
//!
//! The job owns the body of one tab: clear the body range, then write all
//! rows in one contiguous block starting at A2. Row 1 belongs to the
//! dashboard (headers and formulas) and is never touched. A run with zero
//! rows leaves the body cleared instead of stale.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::SalesRow;

use super::auth::{ServiceAccountKey, TokenSource};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Sheets values API
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// First body row; row 1 holds the dashboard's headers.
const BODY_START_ROW: u32 = 2;

/// Last row the clear covers. Far beyond any realistic export so leftover
/// rows from a larger previous run cannot survive.
const BODY_END_ROW: u32 = 10_000;

/// Last body column, derived from the row width (column A plus eleven).
const LAST_COLUMN: char = (b'A' + SalesRow::WIDTH as u8 - 1) as char;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest error-body slice carried into a failure message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Request body for a values write, mirroring the API's ValueRange.
#[derive(Debug, Serialize, PartialEq)]
struct ValueRange {
    range: String,
    #[serde(rename = "majorDimension")]
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(rename = "updatedRows")]
    updated_rows: Option<i64>,
    #[serde(rename = "updatedCells")]
    updated_cells: Option<i64>,
}

/// Client for one destination tab of one spreadsheet.
pub struct SheetsClient {
    client: Client,
    auth: TokenSource,
    spreadsheet_id: String,
    tab: String,
}

impl SheetsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let key = ServiceAccountKey::from_json(&config.service_account_json)?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            auth: TokenSource::new(key, client.clone()),
            client,
            spreadsheet_id: config.spreadsheet_id.clone(),
            tab: config.sheet_tab.clone(),
        })
    }

    /// Mint a token without writing anything. Run before the fetch so bad
    /// Google credentials fail the job in seconds instead of after minutes
    /// of paging.
    pub async fn ensure_token(&mut self) -> Result<()> {
        self.auth.bearer().await.map(|_| ())
    }

    /// Replace the tab's body with `rows`: clear first, then one write.
    pub async fn replace(&mut self, rows: &[SalesRow]) -> Result<()> {
        let token = self.auth.bearer().await?;

        self.clear_body(&token).await?;

        let body = match plan_update(&self.tab, rows) {
            Some(body) => body,
            None => {
                info!(tab = %self.tab, "No rows this run, leaving the body cleared");
                return Ok(());
            }
        };
        self.write_body(&token, &body).await
    }

    async fn clear_body(&self, token: &str) -> Result<()> {
        let range = body_range(&self.tab);
        let url = format!(
            "{}/{}/values/{}:clear",
            SHEETS_BASE_URL,
            self.spreadsheet_id,
            urlencoding::encode(&range)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Failed to send clear request")?;

        Self::check_response(response).await?;
        debug!(range = %range, "Body cleared");
        Ok(())
    }

    async fn write_body(&self, token: &str, body: &ValueRange) -> Result<()> {
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_BASE_URL,
            self.spreadsheet_id,
            urlencoding::encode(&body.range)
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(body)
            .send()
            .await
            .context("Failed to send values update")?;

        let response = Self::check_response(response).await?;
        let update: UpdateResponse = response
            .json()
            .await
            .context("Failed to parse update response")?;
        info!(
            tab = %self.tab,
            rows = update.updated_rows.unwrap_or_default(),
            cells = update.updated_cells.unwrap_or_default(),
            "Sheet body replaced"
        );
        Ok(())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, &body))
        }
    }
}

/// Error for a non-success Sheets response, with the body clipped to stay
/// loggable. A 401 here means Google refused the service-account token,
/// not that a CRM key was rejected.
fn status_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    anyhow!(
        "Sheets request failed with {}: {}",
        status,
        body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>()
    )
}

/// A1 reference to the tab's whole body range.
fn body_range(tab: &str) -> String {
    format!(
        "{}!A{}:{}{}",
        quote_tab(tab),
        BODY_START_ROW,
        LAST_COLUMN,
        BODY_END_ROW
    )
}

/// Quote a tab title for A1 notation; embedded quotes double.
fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

/// Build the write body, or None when there is nothing to write and the
/// cleared range should stand.
fn plan_update(tab: &str, rows: &[SalesRow]) -> Option<ValueRange> {
    if rows.is_empty() {
        return None;
    }
    Some(ValueRange {
        range: format!("{}!A{}", quote_tab(tab), BODY_START_ROW),
        major_dimension: "ROWS",
        values: rows.iter().map(SalesRow::to_cells).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(contact_id: &str) -> SalesRow {
        SalesRow {
            contact_id: contact_id.to_string(),
            location: "Salem".to_string(),
            full_name: "Olivia Baker".to_string(),
            email: "olivia@example.com".to_string(),
            signup_date: "2024-03-15".to_string(),
            tour_member: "Tina".to_string(),
            sale_member: "Dana".to_string(),
            same_day_sale: "No".to_string(),
            day_one_booked: "No".to_string(),
            sale_tagged: "Yes".to_string(),
            month: "March".to_string(),
            year: "2024".to_string(),
        }
    }

    #[test]
    fn test_body_range_covers_all_columns() {
        assert_eq!(body_range("Raw Data"), "'Raw Data'!A2:L10000");
    }

    #[test]
    fn test_tab_titles_are_quoted() {
        assert_eq!(quote_tab("Raw Data"), "'Raw Data'");
        assert_eq!(quote_tab("Tom's Data"), "'Tom''s Data'");
    }

    #[test]
    fn test_plan_update_skipped_for_empty_run() {
        assert_eq!(plan_update("Raw Data", &[]), None);
    }

    #[test]
    fn test_plan_update_writes_from_first_body_row() {
        let rows = vec![row("a"), row("b")];
        let body = plan_update("Raw Data", &rows).expect("rows should produce a write");

        assert_eq!(body.range, "'Raw Data'!A2");
        assert_eq!(body.major_dimension, "ROWS");
        assert_eq!(body.values.len(), 2);
        assert_eq!(body.values[0].len(), SalesRow::WIDTH);
        assert_eq!(body.values[0][0], "a");
        assert_eq!(body.values[1][0], "b");
    }

    #[test]
    fn test_status_error_names_the_sheets_api() {
        let err = status_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error": {"code": 401, "status": "UNAUTHENTICATED"}}"#,
        );
        let message = err.to_string();
        assert!(message.starts_with("Sheets request failed with 401"));
        assert!(message.contains("UNAUTHENTICATED"));
        assert!(!message.contains("API key"));
    }

    #[test]
    fn test_status_error_clips_long_bodies() {
        let body = "x".repeat(1000);
        let message = status_error(reqwest::StatusCode::BAD_REQUEST, &body).to_string();
        assert!(message.len() < 260);
    }

    #[test]
    fn test_update_response_parses() {
        let json = r#"{
            "spreadsheetId": "sheet-id",
            "updatedRange": "'Raw Data'!A2:L3",
            "updatedRows": 2,
            "updatedColumns": 12,
            "updatedCells": 24
        }"#;
        let update: UpdateResponse = serde_json::from_str(json).expect("response should parse");
        assert_eq!(update.updated_rows, Some(2));
        assert_eq!(update.updated_cells, Some(24));
    }
}
