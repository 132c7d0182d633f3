//! Stations and playback queues.
//!
//! `create_station` builds a playback queue via
//! `mpqs/voiceenabled/createQueue`; the queue is then paged with
//! `mpqs/voiceenabled/getNextTracks`, threading `nextPageToken` from each
//! response into the next request's `pageToken`. Stations are unending:
//! the iterator keeps yielding tracks for as long as the service keeps
//! returning page tokens.

use crate::action;
use crate::client::AmazonMusic;
use crate::error::Result;
use crate::types::{self, Station, Track};
use serde_json::{Value, json};
use std::collections::VecDeque;

/// Tracks requested per `getNextTracks` page.
const PAGE_SIZE: u64 = 10;

impl AmazonMusic {
    /// Create a station that can be played, from a station key
    /// (e.g. `A2UW0MECRAWILL`). Not idempotent — do not blindly retry.
    pub fn create_station(&self, station_id: &str) -> Result<Station> {
        let session = self.session();
        let body = json!({
            "identifier": station_id,
            "identifierType": "STATION_KEY",
            "customerInfo": {
                "deviceId": session.device_id,
                "deviceType": session.device_type,
                "musicTerritory": session.territory,
                "customerId": session.customer_id,
            },
        });
        let mut resp = self.call(action::CREATE_QUEUE, &body)?;
        // The station key is not echoed back in the queue document.
        if let Some(obj) = resp.as_object_mut() {
            obj.insert("stationKey".to_owned(), Value::String(station_id.to_owned()));
        }
        Ok(types::parse_station(&resp))
    }

    /// Iterate the tracks of a station, fetching further queue pages on
    /// demand. Single-pass and blocking: each page fetch completes before
    /// the next track is yielded.
    pub fn station_tracks<'a>(&'a self, station: &Station) -> StationTracks<'a> {
        StationTracks {
            client: self,
            buffer: station
                .tracks
                .iter()
                .cloned()
                .map(Ok)
                .collect(),
            page_token: station.page_token.clone(),
        }
    }
}

/// Lazy track sequence for a station; see
/// [`station_tracks`](AmazonMusic::station_tracks).
pub struct StationTracks<'a> {
    client: &'a AmazonMusic,
    buffer: VecDeque<Result<Track>>,
    page_token: Option<String>,
}

impl StationTracks<'_> {
    fn fetch_next_page(&mut self) -> Result<()> {
        let Some(token) = self.page_token.take() else {
            return Ok(());
        };
        let session = self.client.session();
        let body = json!({
            "pageToken": token,
            "numberOfTracks": PAGE_SIZE,
            "customerInfo": {
                "deviceId": session.device_id,
                "deviceType": session.device_type,
                "musicTerritory": session.territory,
                "customerId": session.customer_id,
            },
        });
        let resp = self.client.call(action::GET_NEXT_TRACKS, &body)?;
        self.page_token = resp["nextPageToken"].as_str().map(str::to_owned);
        if let Some(tracks) = resp["trackMetadataList"].as_array() {
            self.buffer
                .extend(tracks.iter().map(|t| Ok(types::parse_track(t))));
        }
        Ok(())
    }
}

impl Iterator for StationTracks<'_> {
    type Item = Result<Track>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            if self.page_token.is_none() {
                return None;
            }
            if let Err(e) = self.fetch_next_page() {
                return Some(Err(e));
            }
        }
        self.buffer.pop_front()
    }
}
