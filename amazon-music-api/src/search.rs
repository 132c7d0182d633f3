//! Catalogue and library search via the Tenzing service.
//!
//! Endpoint: `POST {region}/api/search/v1_1/`
//!
//! The request carries a typed query document (`BooleanQuery`,
//! `MatchQuery`, `ExistsQuery`, `TermQuery`) plus one result spec per
//! requested entity kind. The dispatcher passes the document through
//! unmodified; this module only assembles the shape the web player
//! sends. Results come back as labelled raw documents
//! (`catalog_tracks`, `library_albums`, ...) and are returned as such —
//! the native structure is still a work in progress upstream.

use crate::action;
use crate::client::AmazonMusic;
use crate::error::{AmazonMusicError, Result};
use serde_json::{Value, json};

const SEARCH_MODEL: &str = "com.amazon.music.search.model";

/// Which result sets a search should request.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Limit to the user's library (no catalogue results).
    pub library_only: bool,
    pub tracks: bool,
    pub albums: bool,
    pub playlists: bool,
    pub artists: bool,
    /// Stations only exist in the catalogue, so this is ignored when
    /// `library_only` is set.
    pub stations: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            library_only: false,
            tracks: true,
            albums: true,
            playlists: true,
            artists: true,
            stations: true,
        }
    }
}

impl AmazonMusic {
    /// Search for the given query and return the matching result sets as
    /// `(label, document)` pairs. `None` searches for everything (an
    /// exists-query on `asin`).
    pub fn search(&self, query: Option<&str>, opts: &SearchOptions) -> Result<Vec<(String, Value)>> {
        let body = self.search_body(query, opts);
        let resp = self.call(action::SEARCH, &body)?;
        let results = resp["results"]
            .as_array()
            .ok_or_else(|| AmazonMusicError::MalformedResponse {
                body: resp.to_string(),
            })?;
        Ok(results
            .iter()
            .map(|item| {
                let label = item["label"].as_str().unwrap_or_default().to_owned();
                (label, item.clone())
            })
            .collect())
    }

    fn search_body(&self, query: Option<&str>, opts: &SearchOptions) -> Value {
        let session = self.session();

        let inner = match query {
            Some(q) => json!({
                "__type": format!("{SEARCH_MODEL}#MatchQuery"),
                "query": q,
            }),
            None => json!({
                "__type": format!("{SEARCH_MODEL}#ExistsQuery"),
                "fieldName": "asin",
            }),
        };

        // Catalogue searches wrap the query so Prime results rank first;
        // library searches use it bare.
        let query_doc = if opts.library_only {
            inner
        } else {
            json!({
                "__type": format!("{SEARCH_MODEL}#BooleanQuery"),
                "must": [inner],
                "should": [{
                    "__type": format!("{SEARCH_MODEL}#TermQuery"),
                    "fieldName": "primeStatus",
                    "term": "PRIME",
                }],
            })
        };

        let mut result_specs = Vec::new();
        let kinds = [
            ("track", opts.tracks),
            ("album", opts.albums),
            ("playlist", opts.playlists),
            ("artist", opts.artists),
            ("station", opts.stations),
        ];
        for (kind, wanted) in kinds {
            if !wanted {
                continue;
            }
            if kind != "station" {
                result_specs.push(result_spec(&format!("library_{kind}")));
            }
            if !opts.library_only {
                result_specs.push(result_spec(&format!("catalog_{kind}")));
            }
        }

        json!({
            "deviceId": session.device_id,
            "deviceType": session.device_type,
            "musicTerritory": session.territory,
            "customerId": session.customer_id,
            "languageLocale": session.locale,
            "requestContext": { "customerInitiated": true },
            "query": query_doc,
            "resultSpecs": result_specs,
        })
    }
}

fn result_spec(label: &str) -> Value {
    json!({
        "label": format!("{label}s"),
        "documentSpecs": [{
            "type": label,
            "fields": [
                "__DEFAULT",
                "artFull",
                "fileExtension",
                "isMusicSubscription",
                "primeStatus"
            ],
        }],
        "maxResults": 30,
    })
}

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
    fn catalogue_query_wraps_in_boolean_with_prime_boost() {
        let client = test_client();
        let body = client.search_body(Some("blue moon"), &SearchOptions::default());
        assert_eq!(
            body["query"]["__type"],
            "com.amazon.music.search.model#BooleanQuery"
        );
        assert_eq!(body["query"]["must"][0]["query"], "blue moon");
        assert_eq!(body["query"]["should"][0]["term"], "PRIME");
        // Every kind requested: 4 library + 5 catalogue specs.
        assert_eq!(body["resultSpecs"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn library_only_uses_bare_query_and_skips_stations() {
        let client = test_client();
        let opts = SearchOptions {
            library_only: true,
            ..SearchOptions::default()
        };
        let body = client.search_body(None, &opts);
        assert_eq!(
            body["query"]["__type"],
            "com.amazon.music.search.model#ExistsQuery"
        );
        let specs = body["resultSpecs"].as_array().unwrap();
        assert_eq!(specs.len(), 4);
        assert!(specs.iter().all(|s| {
            s["label"].as_str().unwrap().starts_with("library_")
        }));
    }
}
