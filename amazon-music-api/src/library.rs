//! Library queries via the legacy cirrus API.
//!
//! Endpoint: `POST {region}/api/cirrus/`, URL-encoded form with an
//! `Operation=searchLibrary` field (no `X-Amz-Target` header). Results
//! arrive under `searchLibraryResponse.searchLibraryResult`, with rows in
//! `searchReturnItemList` and a `nextResultsToken` cursor; paging runs
//! through [`AmazonMusic::paginate`].
//!
//! The service marks rows with `primeStatus`, but the web player ignores
//! it and lists everything; so does this module (the marker is still on
//! each parsed track for callers that care).

use crate::action;
use crate::client::AmazonMusic;
use crate::error::{AmazonMusicError, Result};
use crate::types::{self, Album, Artist, Genre, Track};
use serde_json::{Map, Value};

const ITEMS_POINTER: &str = "/searchLibraryResponse/searchLibraryResult/searchReturnItemList";

impl AmazonMusic {
    /// Albums in the user's library, sorted by album name.
    pub fn my_albums(&self) -> Result<Vec<Album>> {
        let query = self.cirrus_query(
            "ALBUMS",
            "getAllDataByMetaType",
            "sortAlbumName",
            100,
            &ALBUM_COLUMNS,
            false,
        );
        self.collect_library(&query, |doc| types::parse_album(doc))
    }

    /// Artists in the user's library, sorted by artist name.
    pub fn my_artists(&self) -> Result<Vec<Artist>> {
        let query = self.cirrus_query(
            "ARTISTS",
            "getAllDataByMetaType",
            "sortArtistName",
            100,
            &ARTIST_COLUMNS,
            false,
        );
        self.collect_library(&query, |doc| types::parse_artist(doc))
    }

    /// Genres represented in the user's library.
    pub fn my_genres(&self) -> Result<Vec<Genre>> {
        let query = self.cirrus_query(
            "GENRES",
            "getAllDataByMetaType",
            "primaryGenre",
            100,
            &GENRE_COLUMNS,
            false,
        );
        self.collect_library(&query, |doc| types::parse_genre(doc))
    }

    /// Tracks stored in the user's library, sorted by title.
    pub fn my_songs(&self) -> Result<Vec<Track>> {
        let query = self.cirrus_query(
            "TRACKS",
            "getServerSongs",
            "sortTitle",
            500,
            &TRACK_COLUMNS,
            true,
        );
        self.collect_library(&query, |doc| types::parse_track(&doc["metadata"]))
    }

    fn collect_library<T>(
        &self,
        query: &Value,
        parse: impl Fn(&Value) -> T,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in self.paginate(action::SEARCH_LIBRARY, query)? {
            let page = page?;
            let rows = page
                .pointer(ITEMS_POINTER)
                .and_then(Value::as_array)
                .ok_or_else(|| AmazonMusicError::MalformedResponse {
                    body: page.to_string(),
                })?;
            items.extend(rows.iter().map(&parse));
        }
        Ok(items)
    }

    /// Assemble the flat `searchLibrary` criteria map the legacy API
    /// expects (`searchCriteria.member.N.*`, `selectedColumns.member.N`).
    fn cirrus_query(
        &self,
        return_type: &str,
        caller: &str,
        sort_column: &str,
        max_results: u64,
        columns: &[&str],
        audio_assets: bool,
    ) -> Value {
        let session = self.session();
        let mut q = Map::new();
        let mut put = |k: &str, v: Value| {
            q.insert(k.to_owned(), v);
        };

        put("Operation", "searchLibrary".into());
        put("ContentType", "JSON".into());
        put("searchReturnType", return_type.into());

        put("searchCriteria.member.1.attributeName", "status".into());
        put("searchCriteria.member.1.comparisonType", "EQUALS".into());
        put("searchCriteria.member.1.attributeValue", "AVAILABLE".into());
        if audio_assets {
            put("searchCriteria.member.2.attributeName", "assetType".into());
            put("searchCriteria.member.2.comparisonType", "EQUALS".into());
            put("searchCriteria.member.2.attributeValue", "AUDIO".into());
        } else {
            put("searchCriteria.member.2.attributeName", "trackStatus".into());
            put("searchCriteria.member.2.comparisonType", "IS_NULL".into());
            put("searchCriteria.member.2.attributeValue", Value::Null);
        }

        for (i, column) in columns.iter().enumerate() {
            put(&format!("selectedColumns.member.{}", i + 1), (*column).into());
        }
        put("albumArtUrlsSizeList.member.1", "FULL".into());

        put("sortCriteriaList", Value::Null);
        put("sortCriteriaList.member.1.sortColumn", sort_column.into());
        put("sortCriteriaList.member.1.sortType", "ASC".into());
        put("maxResults", max_results.into());
        put("caller", caller.into());

        put("customerInfo.customerId", session.customer_id.as_str().into());
        put("customerInfo.deviceId", session.device_id.as_str().into());
        put("customerInfo.deviceType", session.device_type.as_str().into());

        Value::Object(q)
    }
}

const ALBUM_COLUMNS: [&str; 12] = [
    "albumArtistName",
    "albumName",
    "artistName",
    "objectId",
    "primaryGenre",
    "sortAlbumArtistName",
    "sortAlbumName",
    "sortArtistName",
    "albumCoverImageFull",
    "albumAsin",
    "artistAsin",
    "gracenoteId",
];

const ARTIST_COLUMNS: [&str; 13] = [
    "albumArtistName",
    "albumName",
    "artistName",
    "objectId",
    "primaryGenre",
    "sortAlbumArtistName",
    "sortAlbumName",
    "sortArtistName",
    "albumCoverImageFull",
    "albumAsin",
    "artistAsin",
    "gracenoteId",
    "physicalOrderId",
];

const GENRE_COLUMNS: [&str; 2] = ["objectId", "primaryGenre"];

const TRACK_COLUMNS: [&str; 20] = [
    "albumArtistName",
    "albumName",
    "artistName",
    "assetType",
    "duration",
    "objectId",
    "sortAlbumArtistName",
    "sortAlbumName",
    "sortArtistName",
    "albumCoverImageFull",
    "title",
    "status",
    "trackStatus",
    "extension",
    "asin",
    "primeStatus",
    "albumCoverImageLarge",
    "albumCoverImageMedium",
    "albumCoverImageSmall",
    "isMusicSubscription",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;

    fn test_client() -> AmazonMusic {
        AmazonMusic::with_session(Session {
            region: "EU".into(),
            base_url: "https://music.amazon.co.uk".into(),
            csrf_token: "t".into(),
            csrf_ts: "ts".into(),
            csrf_rnd: "r".into(),
            device_id: "dev1".into(),
            device_type: "dtype".into(),
            customer_id: "cust1".into(),
            territory: "GB".into(),
            locale: "en_GB".into(),
        })
        .unwrap()
    }

    #[test]
    fn cirrus_query_shape() {
        let client = test_client();
        let q = client.cirrus_query(
            "ALBUMS",
            "getAllDataByMetaType",
            "sortAlbumName",
            100,
            &ALBUM_COLUMNS,
            false,
        );
        assert_eq!(q["Operation"], "searchLibrary");
        assert_eq!(q["searchReturnType"], "ALBUMS");
        assert_eq!(q["searchCriteria.member.2.comparisonType"], "IS_NULL");
        assert_eq!(q["selectedColumns.member.1"], "albumArtistName");
        assert_eq!(q["selectedColumns.member.12"], "gracenoteId");
        assert_eq!(q["maxResults"], 100);
        assert_eq!(q["customerInfo.customerId"], "cust1");
    }

    #[test]
    fn songs_query_filters_audio_assets() {
        let client = test_client();
        let q = client.cirrus_query(
            "TRACKS",
            "getServerSongs",
            "sortTitle",
            500,
            &TRACK_COLUMNS,
            true,
        );
        assert_eq!(q["searchCriteria.member.2.attributeName"], "assetType");
        assert_eq!(q["searchCriteria.member.2.attributeValue"], "AUDIO");
        assert_eq!(q["caller"], "getServerSongs");
    }
}
