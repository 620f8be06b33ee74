//! Census REST client implementing [`EntityLookup`].
//!
//! Queries the public PlanetSide 2 Census API:
//!
//! ```text
//! GET {base_url}/s:{service_id}/get/ps2:v2/character/?character_id=..&c:show=character_id,faction_id
//! GET {base_url}/s:{service_id}/get/ps2:v2/characters_online_status/?character_id=..
//! GET {base_url}/s:{service_id}/get/ps2:v2/map_region/?facility_id=..
//! ```
//!
//! Census reports most failures with HTTP 200 and an `error` or
//! `errorMessage` field; both are mapped to [`LookupError::Unavailable`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::{CharacterId, FacilityId, Faction, MapRegion};
use crate::error::{LookupError, TrackerError};
use crate::lookup::{EntityLookup, LOOKUP_TIMEOUT};

/// Public Census endpoint.
pub const DEFAULT_CENSUS_URL: &str = "https://census.daybreakgames.com";

const NAMESPACE: &str = "ps2:v2";

/// Census API client.
pub struct CensusLookup {
    http: Client,
    base_url: String,
    service_id: String,
}

impl std::fmt::Debug for CensusLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CensusLookup")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CensusLookup {
    /// Creates a client for `base_url` authenticated with `service_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, service_id: &str) -> Result<Self, TrackerError> {
        let http = Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(concat!("ops-commander/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackerError::Config(format!("census http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_id: service_id.to_string(),
        })
    }

    fn url(&self, collection: &str, filter: &str) -> String {
        format!(
            "{}/s:{}/get/{NAMESPACE}/{collection}/?{filter}",
            self.base_url, self.service_id
        )
    }

    async fn first_row<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &str,
    ) -> Result<Option<T>, LookupError> {
        let body = self
            .http
            .get(self.url(collection, filter))
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .text()
            .await
            .map_err(unavailable)?;
        first_in_list(&body, &format!("{collection}_list"))
    }
}

fn unavailable(e: reqwest::Error) -> LookupError {
    LookupError::Unavailable(e.to_string())
}

/// Extracts the first row of `list_key` from a Census response body.
fn first_in_list<T: DeserializeOwned>(body: &str, list_key: &str) -> Result<Option<T>, LookupError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| LookupError::Unavailable(format!("census response: {e}")))?;
    for key in ["error", "errorMessage"] {
        if let Some(message) = value.get(key).and_then(serde_json::Value::as_str) {
            return Err(LookupError::Unavailable(format!("census: {message}")));
        }
    }
    let Some(row) = value
        .get(list_key)
        .and_then(serde_json::Value::as_array)
        .and_then(|rows| rows.first())
    else {
        return Ok(None);
    };
    T::deserialize(row)
        .map(Some)
        .map_err(|e| LookupError::Unavailable(format!("census {list_key}: {e}")))
}

#[derive(Debug, Deserialize)]
struct CharacterRow {
    faction_id: String,
}

#[derive(Debug, Deserialize)]
struct OnlineStatusRow {
    online_status: String,
}

#[derive(Debug, Deserialize)]
struct MapRegionRow {
    facility_name: String,
    #[serde(default)]
    facility_type: String,
}

#[async_trait]
impl EntityLookup for CensusLookup {
    async fn character_faction(&self, id: CharacterId) -> Result<Option<Faction>, LookupError> {
        let row: Option<CharacterRow> = self
            .first_row(
                "character",
                &format!("character_id={id}&c:show=character_id,faction_id"),
            )
            .await?;
        Ok(row
            .and_then(|r| r.faction_id.parse().ok())
            .and_then(Faction::from_id))
    }

    async fn is_online(&self, id: CharacterId) -> Result<bool, LookupError> {
        let row: Option<OnlineStatusRow> = self
            .first_row("characters_online_status", &format!("character_id={id}"))
            .await?;
        // online_status holds the world ID while logged in, "0" otherwise
        Ok(row.is_some_and(|r| r.online_status.parse::<u32>().is_ok_and(|world| world > 0)))
    }

    async fn map_region(&self, id: FacilityId) -> Result<Option<MapRegion>, LookupError> {
        let row: Option<MapRegionRow> = self
            .first_row("map_region", &format!("facility_id={id}"))
            .await?;
        Ok(row.map(|r| MapRegion {
            facility_name: r.facility_name,
            facility_type: r.facility_type,
        }))
    }
}
