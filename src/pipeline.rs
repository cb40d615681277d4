//! Sequential run orchestration: one location at a time, credentials
//! resolved as each comes up, failures contained to the location that
//! raised them.

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::highlevel::ApiClient;
use crate::models::{SalesRow, TeamMembers};
use crate::transform;

/// Everything a completed run produced, whether or not every location
/// cooperated.
#[derive(Debug)]
pub struct RunReport {
    pub rows: Vec<SalesRow>,
    pub team: TeamMembers,
    pub locations: Vec<LocationOutcome>,
}

#[derive(Debug)]
pub struct LocationOutcome {
    pub name: String,
    pub rows: usize,
    pub status: LocationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    Fetched,
    MissingCredential,
    Failed,
}

impl RunReport {
    pub fn log_summary(&self) {
        for location in &self.locations {
            match location.status {
                LocationStatus::Fetched => {
                    info!(location = %location.name, rows = location.rows, "Location complete");
                }
                LocationStatus::MissingCredential => {
                    warn!(location = %location.name, "Location skipped: no API key");
                }
                LocationStatus::Failed => {
                    warn!(location = %location.name, "Location failed and contributed no rows");
                }
            }
        }
        info!(
            rows = self.rows.len(),
            sale_team = ?self.team.sale,
            tour_team = ?self.team.tour,
            "Run summary"
        );
    }
}

pub struct Pipeline {
    config: Config,
    crm: ApiClient,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let crm = ApiClient::new(&config)?;
        Ok(Self { config, crm })
    }

    /// Fetch and flatten every configured location. Per-location problems
    /// are recorded in the report, never propagated; by this point the only
    /// way to lose the whole run is a bug.
    pub async fn run(&self) -> RunReport {
        let since = self.config.window_start();
        let mut rows: Vec<SalesRow> = Vec::new();
        let mut locations = Vec::with_capacity(self.config.locations.len());

        for location in &self.config.locations {
            let api_key = match self.config.resolve_api_key(location) {
                Some(key) => key,
                None => {
                    warn!(location = %location.name, "No API key configured, skipping location");
                    locations.push(LocationOutcome {
                        name: location.name.clone(),
                        rows: 0,
                        status: LocationStatus::MissingCredential,
                    });
                    continue;
                }
            };

            match self.crm.fetch_sales_contacts(location, &api_key, since).await {
                Ok(contacts) => {
                    let kept_before = rows.len();
                    rows.extend(contacts.iter().map(|contact| {
                        transform::sales_row(contact, &location.name, &self.config.field_keys)
                    }));
                    locations.push(LocationOutcome {
                        name: location.name.clone(),
                        rows: rows.len() - kept_before,
                        status: LocationStatus::Fetched,
                    });
                }
                Err(err) => {
                    warn!(location = %location.name, error = %err, "Location fetch failed, continuing");
                    locations.push(LocationOutcome {
                        name: location.name.clone(),
                        rows: 0,
                        status: LocationStatus::Failed,
                    });
                }
            }
        }

        let team = TeamMembers::from_rows(&rows);
        RunReport { rows, team, locations }
    }
}
