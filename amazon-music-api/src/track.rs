//! Track resolution and stream-URL lookup.
//!
//! Stream URLs come from the digital music locator
//! (`POST {region}/api/dmls/`). The returned URL points at an M3U
//! playlist of ~10s segments; a player that handles playlists seamlessly
//! (e.g. VLC) is required.

use crate::action;
use crate::client::AmazonMusic;
use crate::error::{AmazonMusicError, Result};
use crate::search::SearchOptions;
use crate::types::{self, Track};
use serde_json::json;

impl AmazonMusic {
    /// Get a track by ASIN.
    ///
    /// There is no direct track-lookup endpoint; the web player resolves
    /// single tracks through search, and so does this.
    pub fn get_track(&self, asin: &str) -> Result<Track> {
        let opts = SearchOptions {
            library_only: false,
            tracks: true,
            albums: false,
            playlists: false,
            artists: false,
            stations: false,
        };
        let results = self.search(Some(asin), &opts)?;
        let doc = results
            .iter()
            .find(|(label, _)| label == "catalog_tracks")
            .and_then(|(_, item)| item.pointer("/hits/0/document").cloned())
            .ok_or_else(|| AmazonMusicError::MalformedResponse {
                body: format!("track not found in search results: {asin}"),
            })?;
        Ok(types::parse_track(&doc))
    }

    /// Resolve a streamable URL for a track.
    ///
    /// Fails with [`Api`](AmazonMusicError::Api) when the service reports
    /// `MAX_CONCURRENCY_REACHED` (another device is streaming on the same
    /// account).
    pub fn stream_url(&self, track: &Track) -> Result<String> {
        let session = self.session();
        let body = json!({
            "customerId": session.customer_id,
            "deviceToken": {
                "deviceTypeId": session.device_type,
                "deviceId": session.device_id,
            },
            "appMetadata": { "https": "true" },
            "clientMetadata": { "clientId": "WebCP" },
            "contentId": {
                "identifier": track.identifier,
                "identifierType": track.identifier_type,
                "bitRate": "HIGH",
                "contentDuration": track.duration,
            },
        });
        let resp = self.call(action::GET_STREAM_URL, &body)?;

        if let Some(status) = resp["statusCode"].as_str() {
            if status != "SUCCESS" {
                return Err(AmazonMusicError::Api {
                    status: status.to_owned(),
                    body: resp.to_string(),
                });
            }
        }

        resp.pointer("/contentResponse/urlList/0")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| AmazonMusicError::MalformedResponse {
                body: resp.to_string(),
            })
    }
}
