//! Album and playlist lookup via the muse ensemble service.
//!
//! Endpoint: `POST {region}/api/muse/legacy/lookup`
//!
//! Request: `{ "asins": ["B00J9AEZ7G"], "features": [...],
//! "requestedContent": "MUSIC_SUBSCRIPTION", ...customer fields }`
//!
//! The response carries an `albumList` (or `playlistList`) with the
//! expanded tracklist when `expandTracklist` is requested.

use crate::action;
use crate::client::AmazonMusic;
use crate::error::{AmazonMusicError, Result};
use crate::types::{self, Album, Playlist};
use serde_json::{Value, json};

impl AmazonMusic {
    /// Get an album that can be played, by ASIN (e.g. `B00J9AEZ7G`).
    pub fn get_album(&self, asin: &str) -> Result<Album> {
        let resp = self.call(action::LOOKUP, &self.lookup_body(asin))?;
        let doc = first_of(&resp, "/albumList/0")?;
        Ok(types::parse_album(doc))
    }

    /// Get a playlist that can be played, by ASIN (e.g. `B075QGZDZ3`).
    pub fn get_playlist(&self, asin: &str) -> Result<Playlist> {
        let resp = self.call(action::LOOKUP, &self.lookup_body(asin))?;
        let doc = first_of(&resp, "/playlistList/0")?;
        Ok(types::parse_playlist(doc))
    }

    fn lookup_body(&self, asin: &str) -> Value {
        let session = self.session();
        json!({
            "asins": [asin],
            "features": [
                "popularity",
                "expandTracklist",
                "trackLibraryAvailability",
                "collectionLibraryAvailability"
            ],
            "requestedContent": "MUSIC_SUBSCRIPTION",
            "deviceId": session.device_id,
            "deviceType": session.device_type,
            "musicTerritory": session.territory,
            "customerId": session.customer_id,
        })
    }
}

fn first_of<'v>(resp: &'v Value, pointer: &str) -> Result<&'v Value> {
    resp.pointer(pointer)
        .ok_or_else(|| AmazonMusicError::MalformedResponse {
            body: resp.to_string(),
        })
}
