//! Amazon Music web API client library.
//!
//! The service exposes no public API: it expects a real browser. This
//! crate establishes and maintains a believable browser session — the
//! multi-step sign-in flow, region-specific redirection, configuration
//! extracted from script-embedded JSON, and cookie persistence — and
//! dispatches signed API calls over it.
//!
//! # Sessions
//!
//! ```no_run
//! use amazon_music_api::{AmazonMusic, CredentialSource};
//!
//! // Prompted credentials: the provider runs at most once per
//! // establishment attempt, and not at all when cached cookies are
//! // still valid.
//! let credentials = CredentialSource::deferred(|| {
//!     // read email/password from the terminal...
//! #   amazon_music_api::Credentials::new("a@b.c", "pw")
//! });
//! let client = AmazonMusic::connect(&credentials).unwrap();
//! println!("signed in to region {}", client.session().region);
//! ```
//!
//! Cookies (plus the discovered regional target) persist in
//! `~/.amazon-music-cookies.json`, so later runs usually skip the login
//! entirely.
//!
//! # API endpoint mapping
//!
//! Calls go to `POST {base}/{region}/api/{path}`, signed with the CSRF
//! triple and the dotted action name as `X-Amz-Target`:
//!
//! | Method                                | Path                              |
//! |---------------------------------------|-----------------------------------|
//! | [`AmazonMusic::create_station`]       | `mpqs/voiceenabled/createQueue`   |
//! | [`AmazonMusic::station_tracks`]       | `mpqs/voiceenabled/getNextTracks` |
//! | [`AmazonMusic::get_album`] / [`AmazonMusic::get_playlist`] | `muse/legacy/lookup` |
//! | [`AmazonMusic::stream_url`]           | `dmls/`                           |
//! | [`AmazonMusic::search`]               | `search/v1_1/`                    |
//! | [`AmazonMusic::recommendations`]      | `muse/legacy/getBrowseRecommendations/` |
//! | [`AmazonMusic::my_albums`] etc.       | `cirrus/` (legacy form API)       |
//!
//! Raw access is available through [`AmazonMusic::call`] and
//! [`AmazonMusic::paginate`] with the action names in [`action`].

pub mod action;
mod album;
pub mod auth;
mod client;
pub mod cookies;
pub mod credentials;
pub mod error;
mod html;
mod library;
mod recommend;
mod search;
mod station;
mod track;
mod transport;
pub mod types;

pub use auth::Session;
pub use client::{AmazonMusic, Connector, Pages};
pub use credentials::{CredentialSource, Credentials};
pub use error::{AmazonMusicError, Result};
pub use recommend::Recommendation;
pub use search::SearchOptions;
pub use station::StationTracks;
