//! Static mapping of remote actions to API endpoints.
//!
//! The service names its operations after fully-qualified Java classes;
//! that dotted name doubles as the `X-Amz-Target` signing header. The
//! mapping here is a closed set: an unmapped action fails with
//! [`UnknownAction`](crate::AmazonMusicError::UnknownAction) before any
//! network call is attempted, rather than letting the server answer with
//! an ambiguous 404.
//!
//! The one exception is the legacy cirrus library API, which has no
//! dotted class name upstream: it is addressed by the bare `Operation`
//! form field. It is registered here under that bare name, and the
//! absence of dots selects the form encoding.

use crate::error::{AmazonMusicError, Result};

/// Create a playback queue for a station. Not idempotent; do not retry.
pub const CREATE_QUEUE: &str = "com.amazon.musicplayqueueservice.model.client.external.\
                                voiceenabled.MusicPlayQueueServiceExternalVoiceEnabledClient.createQueue";

/// Page through a playback queue.
pub const GET_NEXT_TRACKS: &str = "com.amazon.musicplayqueueservice.model.client.external.\
                                   voiceenabled.MusicPlayQueueServiceExternalVoiceEnabledClient.getNextTracks";

/// Resolve tracks for an album or playlist.
pub const LOOKUP: &str = "com.amazon.musicensembleservice.MusicEnsembleService.lookup";

/// Resolve a playable stream URL for a track.
pub const GET_STREAM_URL: &str =
    "com.amazon.digitalmusiclocator.DigitalMusicLocatorServiceExternal.getRestrictedStreamingURL";

/// Catalogue/library search.
pub const SEARCH: &str = "com.amazon.tenzing.v1_1.TenzingServiceExternalV1_1.search";

/// Browse recommendations.
pub const GET_BROWSE_RECOMMENDATIONS: &str =
    "com.amazon.musicensembleservice.MusicEnsembleService.getBrowseRecommendations";

/// Legacy cirrus library query (form-encoded `Operation` field).
pub const SEARCH_LIBRARY: &str = "searchLibrary";

/// How the request body and signing header are encoded for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoding {
    /// JSON body with `X-Amz-Target` and `Content-Encoding: amz-1.0`.
    AmzTarget,
    /// URL-encoded form body with an `Operation` field; no target header.
    CirrusForm,
}

/// Where an endpoint's pagination cursor lives, when it has one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CursorSpec {
    /// Request-body field the cursor is merged into on follow-up calls.
    pub request_field: &'static str,
    /// JSON pointer to the cursor in each response page.
    pub response_pointer: &'static str,
}

/// A resolved endpoint for a known action.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Endpoint {
    /// Path under `{regionPrefix}/api/`.
    pub path: &'static str,
    pub encoding: Encoding,
    pub cursor: Option<CursorSpec>,
}

/// Resolve an action name to its endpoint, or fail fast.
pub(crate) fn resolve(action: &str) -> Result<Endpoint> {
    let endpoint = match action {
        CREATE_QUEUE => Endpoint {
            path: "mpqs/voiceenabled/createQueue",
            encoding: Encoding::AmzTarget,
            cursor: None,
        },
        GET_NEXT_TRACKS => Endpoint {
            path: "mpqs/voiceenabled/getNextTracks",
            encoding: Encoding::AmzTarget,
            cursor: Some(CursorSpec {
                request_field: "pageToken",
                response_pointer: "/nextPageToken",
            }),
        },
        LOOKUP => Endpoint {
            path: "muse/legacy/lookup",
            encoding: Encoding::AmzTarget,
            cursor: None,
        },
        GET_STREAM_URL => Endpoint {
            path: "dmls/",
            encoding: Encoding::AmzTarget,
            cursor: None,
        },
        SEARCH => Endpoint {
            path: "search/v1_1/",
            encoding: Encoding::AmzTarget,
            cursor: None,
        },
        GET_BROWSE_RECOMMENDATIONS => Endpoint {
            path: "muse/legacy/getBrowseRecommendations/",
            encoding: Encoding::AmzTarget,
            cursor: None,
        },
        SEARCH_LIBRARY => Endpoint {
            path: "cirrus/",
            encoding: Encoding::CirrusForm,
            cursor: Some(CursorSpec {
                request_field: "nextResultsToken",
                response_pointer: "/searchLibraryResponse/searchLibraryResult/nextResultsToken",
            }),
        },
        other => return Err(AmazonMusicError::UnknownAction(other.to_owned())),
    };
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_actions() {
        assert_eq!(resolve(LOOKUP).unwrap().path, "muse/legacy/lookup");
        assert_eq!(
            resolve(CREATE_QUEUE).unwrap().path,
            "mpqs/voiceenabled/createQueue"
        );
        assert!(matches!(
            resolve(SEARCH_LIBRARY).unwrap().encoding,
            Encoding::CirrusForm
        ));
    }

    #[test]
    fn action_names_have_no_stray_whitespace() {
        // The long names are assembled from continued string literals.
        for name in [CREATE_QUEUE, GET_NEXT_TRACKS, LOOKUP, GET_STREAM_URL] {
            assert!(!name.contains(' '), "{name}");
        }
    }

    #[test]
    fn unknown_action_fails() {
        let err = resolve("com.example.NoSuchService.frobnicate").unwrap_err();
        assert!(matches!(
            err,
            crate::AmazonMusicError::UnknownAction(name) if name.contains("frobnicate")
        ));
    }

    #[test]
    fn cursor_specs() {
        let next = resolve(GET_NEXT_TRACKS).unwrap().cursor.unwrap();
        assert_eq!(next.request_field, "pageToken");
        let cirrus = resolve(SEARCH_LIBRARY).unwrap().cursor.unwrap();
        assert_eq!(cirrus.request_field, "nextResultsToken");
        assert!(resolve(LOOKUP).unwrap().cursor.is_none());
    }
}
