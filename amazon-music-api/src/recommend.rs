//! Browse recommendations via the muse ensemble service.
//!
//! Endpoint: `POST {region}/api/muse/legacy/getBrowseRecommendations/`
//!
//! The response groups entities by `recommendationType`
//! (`PLAYLIST` / `ALBUM` / `TRACK` / `STATION`).

use crate::action;
use crate::client::AmazonMusic;
use crate::error::{AmazonMusicError, Result};
use crate::types::{self, Album, Playlist, Station, Track};
use serde_json::{Value, json};

/// One recommendation group, parsed into the matching entity type.
#[derive(Debug, Clone)]
pub enum Recommendation {
    Playlists(Vec<Playlist>),
    Albums(Vec<Album>),
    Tracks(Vec<Track>),
    Stations(Vec<Station>),
}

impl AmazonMusic {
    /// All recommendation groups for the logged-in user.
    pub fn recommendations(&self) -> Result<Vec<Recommendation>> {
        let session = self.session();
        let body = json!({
            "customerId": session.customer_id,
            "deviceId": session.device_id,
            "deviceType": session.device_type,
            "lang": session.locale,
            "maxResultsPerWidget": 24,
            "minResultsPerWidget": 5,
            "musicTerritory": session.territory,
            "requestedContent": "PRIME",
        });
        let resp = self.call(action::GET_BROWSE_RECOMMENDATIONS, &body)?;
        let groups = resp["recommendations"].as_array().ok_or_else(|| {
            AmazonMusicError::MalformedResponse {
                body: resp.to_string(),
            }
        })?;

        Ok(groups
            .iter()
            .filter_map(|group| match group["recommendationType"].as_str() {
                Some("PLAYLIST") => Some(Recommendation::Playlists(parse_list(
                    &group["playlists"],
                    types::parse_playlist,
                ))),
                Some("ALBUM") => Some(Recommendation::Albums(parse_list(
                    &group["albums"],
                    types::parse_album,
                ))),
                Some("TRACK") => Some(Recommendation::Tracks(parse_list(
                    &group["tracks"],
                    types::parse_track,
                ))),
                Some("STATION") => Some(Recommendation::Stations(parse_list(
                    &group["stations"],
                    types::parse_station,
                ))),
                _ => None,
            })
            .collect())
    }
}

fn parse_list<T>(value: &Value, parse: impl Fn(&Value) -> T) -> Vec<T> {
    value
        .as_array()
        .map(|arr| arr.iter().map(parse).collect())
        .unwrap_or_default()
}
