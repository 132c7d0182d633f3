//! Data types for Amazon Music API responses.
//!
//! The service returns different document shapes for the same entity
//! depending on which endpoint produced it (`muse` lookups, `mpqs`
//! queues, cirrus library rows, Tenzing search hits). The parse functions
//! here normalize those shapes leniently, falling back across the known
//! field spellings and defaulting rather than failing on absent fields.
//!
//! `prime_status` and `is_music_subscription` are passed through exactly
//! as received: whether the service differentiates Prime-only from full
//! subscription via request flag or post-filtering is unresolved
//! upstream, so nothing is normalized away.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An individual track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Track ASIN (or queue identifier when the ASIN is absent).
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Duration in seconds.
    pub duration: u64,
    /// Identifier used by the stream locator (usually the ASIN).
    pub identifier: String,
    /// Identifier type for the stream locator, e.g. `ASIN`.
    pub identifier_type: String,
    /// Raw `primeStatus` marker, passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prime_status: Option<String>,
    /// Raw `isMusicSubscription` marker, passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_music_subscription: Option<String>,
}

/// An album, from a muse lookup or a cirrus library row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub track_count: u64,
    /// Full track list (muse lookups with `expandTracklist` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
}

/// A curated or user playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub track_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
}

/// An artist from the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// A library genre bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
}

/// A streamable, unending station created via `createQueue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Station key (ASIN), e.g. `A2UW0MECRAWILL`.
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Cursor for paging through the queue with `getNextTracks`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Tracks already delivered with the queue.
    pub tracks: Vec<Track>,
}

fn str_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty string among the named fields.
fn first_str(doc: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| str_of(&doc[f]))
}

fn u64_of(doc: &Value, fields: &[&str]) -> u64 {
    fields
        .iter()
        .find_map(|f| {
            let v = &doc[f];
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        })
        .unwrap_or(0)
}

/// Parse a track document from any of the known shapes (`mpqs` queue
/// metadata, `muse` tracklists, cirrus `metadata` rows, search hits).
pub(crate) fn parse_track(doc: &Value) -> Track {
    let id = first_str(doc, &["asin", "identifier", "objectId"]).unwrap_or_default();
    let identifier_type = str_of(&doc["identifierType"]).unwrap_or_else(|| "ASIN".to_owned());
    let identifier = str_of(&doc["identifier"]).unwrap_or_else(|| id.clone());

    let cover_url = doc
        .pointer("/artUrlMap/FULL")
        .or_else(|| doc.pointer("/artUrlMap/LARGE"))
        .or_else(|| doc.pointer("/album/image"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| str_of(&doc["albumCoverImageFull"]));

    Track {
        id,
        title: first_str(doc, &["name", "title"]).unwrap_or_default(),
        artist: first_str(doc, &["artistName"])
            .or_else(|| doc.pointer("/artist/name").and_then(str_of))
            .unwrap_or_default(),
        album: first_str(doc, &["albumName"]).or_else(|| {
            doc.pointer("/album/name")
                .or_else(|| doc.pointer("/album/title"))
                .and_then(str_of)
        }),
        album_artist: first_str(doc, &["albumArtistName"]),
        cover_url,
        duration: u64_of(doc, &["durationInSeconds", "duration", "durationSeconds"]),
        identifier,
        identifier_type,
        prime_status: first_str(doc, &["primeStatus"]),
        is_music_subscription: first_str(doc, &["isMusicSubscription"]),
    }
}

/// Parse an album from a muse lookup document or a cirrus library row.
pub(crate) fn parse_album(doc: &Value) -> Album {
    // Cirrus rows nest the interesting fields under `metadata`.
    let meta = if doc["metadata"].is_object() {
        &doc["metadata"]
    } else {
        doc
    };
    Album {
        id: first_str(meta, &["asin", "albumAsin", "objectId"]).unwrap_or_default(),
        title: first_str(meta, &["title", "albumName", "name"]).unwrap_or_default(),
        artist: first_str(meta, &["artistName", "albumArtistName"]).or_else(|| {
            doc.pointer("/artist/name").and_then(str_of)
        }),
        cover_url: doc
            .pointer("/image")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| first_str(meta, &["albumCoverImageFull", "albumCoverImageLarge"])),
        track_count: u64_of(doc, &["trackCount", "numTracks"])
            .max(u64_of(meta, &["trackCount", "numTracks"])),
        tracks: doc["tracks"]
            .as_array()
            .map(|arr| arr.iter().map(parse_track).collect()),
    }
}

pub(crate) fn parse_playlist(doc: &Value) -> Playlist {
    Playlist {
        id: first_str(doc, &["asin", "playlistId", "objectId"]).unwrap_or_default(),
        title: first_str(doc, &["title", "name"]).unwrap_or_default(),
        description: first_str(doc, &["description"]),
        cover_url: first_str(doc, &["bannerImage", "image", "fourSquareImage"]).or_else(|| {
            doc.pointer("/albumArtImageUrl").and_then(str_of)
        }),
        track_count: u64_of(doc, &["trackCount", "totalTrackCount"]),
        tracks: doc["tracks"]
            .as_array()
            .map(|arr| arr.iter().map(parse_track).collect()),
    }
}

pub(crate) fn parse_artist(doc: &Value) -> Artist {
    let meta = if doc["metadata"].is_object() {
        &doc["metadata"]
    } else {
        doc
    };
    Artist {
        id: first_str(meta, &["artistAsin", "asin", "objectId"]).unwrap_or_default(),
        name: first_str(meta, &["artistName", "name"]).unwrap_or_default(),
        cover_url: first_str(meta, &["albumCoverImageFull"]),
    }
}

pub(crate) fn parse_genre(doc: &Value) -> Genre {
    let meta = if doc["metadata"].is_object() {
        &doc["metadata"]
    } else {
        doc
    };
    Genre {
        id: first_str(meta, &["objectId"]).unwrap_or_default(),
        name: first_str(meta, &["primaryGenre", "name"]).unwrap_or_default(),
    }
}

/// Parse a station from a `createQueue` response (augmented with the
/// station key) or a muse station document.
pub(crate) fn parse_station(doc: &Value) -> Station {
    let queue = &doc["queue"];
    let (title, cover_url, page_token) = if queue.is_object() {
        (
            queue
                .pointer("/queueMetadata/title")
                .and_then(str_of)
                .unwrap_or_default(),
            queue.pointer("/queueMetadata/imageUrlMap/FULL").and_then(str_of),
            str_of(&queue["pageToken"]),
        )
    } else {
        (
            first_str(doc, &["stationTitle"]).unwrap_or_default(),
            first_str(doc, &["stationImageUrl"]),
            doc.pointer("/seed/seedId").and_then(str_of),
        )
    };

    Station {
        id: first_str(doc, &["stationKey", "stationId", "asin"]).unwrap_or_default(),
        title,
        cover_url,
        page_token,
        tracks: doc["trackMetadataList"]
            .as_array()
            .map(|arr| arr.iter().map(parse_track).collect())
            .unwrap_or_default(),
    }
}
