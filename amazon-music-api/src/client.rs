//! HTTP client and request dispatcher for the Amazon Music API.
//!
//! Every call is signed with session-derived tokens: the CSRF triple as
//! headers, and the dotted action name as the `X-Amz-Target` header
//! (mirroring the fully-qualified-class-name convention the service
//! expects). Endpoints resolve through the static [`action`] mapping, so
//! an unmapped action fails before any network I/O.
//!
//! # Response format
//!
//! Responses are arbitrary JSON documents; no schema is imposed here.
//! [`paginate`](AmazonMusic::paginate) recognizes the per-action cursor
//! field and threads it into follow-up requests.

use crate::action::{self, CursorSpec, Encoding, Endpoint};
use crate::auth::{self, Session};
use crate::cookies::CookieJar;
use crate::credentials::CredentialSource;
use crate::error::{AmazonMusicError, Result};
use crate::html;
use crate::transport;
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Presented on every request; the service serves CAPTCHAs to clients it
/// does not recognize as browsers.
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:57.0) Gecko/20100101 Firefox/57.0";

/// Builder for [`AmazonMusic`], carrying the overridable knobs.
pub struct Connector {
    cookie_path: Option<PathBuf>,
    front_door: String,
    timeout: Duration,
}

impl Default for Connector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector {
    pub fn new() -> Self {
        Self {
            cookie_path: None,
            front_door: auth::FRONT_DOOR.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Use a cookie-jar file other than `~/.amazon-music-cookies.json`.
    pub fn cookie_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_path = Some(path.into());
        self
    }

    /// Point the client at a different front door (stub servers in tests).
    pub fn front_door(mut self, url: impl Into<String>) -> Self {
        self.front_door = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load the cookie jar, run session establishment, and return a
    /// ready client.
    pub fn connect(self, credentials: &CredentialSource) -> Result<AmazonMusic> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(Policy::none())
            .timeout(self.timeout)
            .build()?;
        let path = match self.cookie_path {
            Some(p) => p,
            None => CookieJar::default_path()?,
        };
        let mut jar = CookieJar::load(&path)?;
        let session = auth::establish(&http, &mut jar, credentials, &self.front_door)?;
        Ok(AmazonMusic {
            http,
            session,
            jar: Mutex::new(jar),
        })
    }
}

/// Authenticated client for the Amazon Music web API.
///
/// Holds the immutable [`Session`] and the cookie jar (refreshed as the
/// service rotates tokens). One logical session per value; clone nothing,
/// share nothing across processes. Domain methods are implemented in
/// separate modules (`album`, `search`, `station`, `track`, `library`,
/// `recommend`) as `impl AmazonMusic` blocks.
#[derive(Debug)]
pub struct AmazonMusic {
    http: Client,
    session: Session,
    jar: Mutex<CookieJar>,
}

impl AmazonMusic {
    /// Establish a session with default settings and return a client.
    pub fn connect(credentials: &CredentialSource) -> Result<Self> {
        Connector::new().connect(credentials)
    }

    /// Build a client around an already-established [`Session`] and an
    /// in-memory cookie jar (testing, or cookies provided
    /// programmatically).
    pub fn with_session(session: Session) -> Result<Self> {
        Self::with_session_and_jar(session, CookieJar::in_memory())
    }

    /// Build a client around an established [`Session`] and an explicit
    /// cookie jar.
    pub fn with_session_and_jar(session: Session, jar: CookieJar) -> Result<Self> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            session,
            jar: Mutex::new(jar),
        })
    }

    /// The established session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().expect("cookie jar lock poisoned")
    }

    /// Call a remote action and return the decoded JSON response.
    ///
    /// The action name must be in the static endpoint mapping;
    /// [`UnknownAction`](AmazonMusicError::UnknownAction) is raised
    /// before any network call otherwise. A redirect back into the
    /// sign-in portal surfaces as
    /// [`SessionExpired`](AmazonMusicError::SessionExpired); this client
    /// never re-authenticates implicitly — re-establish and retry once.
    pub fn call(&self, action: &str, body: &Value) -> Result<Value> {
        let endpoint = action::resolve(action)?;
        self.dispatch(action, endpoint, body)
    }

    fn dispatch(&self, action: &str, endpoint: Endpoint, body: &Value) -> Result<Value> {
        let url = format!(
            "{}{}api/{}",
            self.session.base_url,
            self.session.region_prefix(),
            endpoint.path
        );
        debug!("dispatching {} to {}", endpoint.path, url);
        let parsed = transport::parse_url(&url)?;
        let host = parsed.host_str().unwrap_or_default().to_owned();

        let mut req = self
            .http
            .post(&url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header("csrf-token", &self.session.csrf_token)
            .header("csrf-rnd", &self.session.csrf_rnd)
            .header("csrf-ts", &self.session.csrf_ts)
            .header("X-Requested-With", "XMLHttpRequest");

        req = match endpoint.encoding {
            Encoding::AmzTarget => req
                .header("X-Amz-Target", action)
                .header(CONTENT_TYPE, "application/json")
                .header("Content-Encoding", "amz-1.0")
                .body(serde_json::to_string(body)?),
            Encoding::CirrusForm => req
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(transport::urlencode_form(&form_fields(body))),
        };

        if let Some(cookie) = self.jar().header_for(&host) {
            req = req.header(COOKIE, cookie);
        }

        let response = req.send()?;
        {
            let mut jar = self.jar();
            transport::store_cookies(&mut jar, &parsed, &response);
            jar.save()?;
        }

        if response.status().is_redirection() {
            let back_to_signin = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|loc| loc.contains(transport::SIGNIN_PATH));
            if back_to_signin {
                return Err(AmazonMusicError::SessionExpired);
            }
        }

        let text = response.text()?;
        match serde_json::from_str(&text) {
            Ok(json) => Ok(json),
            // The service answers a dead session with the sign-in page.
            Err(_) if html::is_login_page(&text) => Err(AmazonMusicError::SessionExpired),
            Err(_) => Err(AmazonMusicError::MalformedResponse { body: text }),
        }
    }

    /// Lazily walk a paginated result set.
    ///
    /// Resolves the action up front (so unknown actions fail before any
    /// network call), then yields one page per [`call`](Self::call),
    /// merging the cursor from each page into the original body until no
    /// cursor remains. The sequence is finite, single-pass, and
    /// non-restartable; each page fetch is a self-contained exchange, so
    /// abandoning it leaves no dangling network state.
    pub fn paginate<'a>(&'a self, action: &'a str, body: &Value) -> Result<Pages<'a>> {
        let endpoint = action::resolve(action)?;
        Ok(Pages {
            client: self,
            action,
            endpoint,
            body: body.clone(),
            state: PageState::Start,
        })
    }
}

enum PageState {
    Start,
    Next(String),
    Done,
}

/// Lazy sequence of response pages; see [`AmazonMusic::paginate`].
pub struct Pages<'a> {
    client: &'a AmazonMusic,
    action: &'a str,
    endpoint: Endpoint,
    body: Value,
    state: PageState,
}

impl Pages<'_> {
    fn cursor_of(&self, page: &Value) -> Option<String> {
        let spec: CursorSpec = self.endpoint.cursor?;
        match page.pointer(spec.response_pointer) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let body = match &self.state {
            PageState::Done => return None,
            PageState::Start => self.body.clone(),
            PageState::Next(token) => {
                let mut body = self.body.clone();
                if let (Some(obj), Some(spec)) = (body.as_object_mut(), self.endpoint.cursor) {
                    obj.insert(spec.request_field.to_owned(), Value::String(token.clone()));
                }
                body
            }
        };

        let page = match self.client.dispatch(self.action, self.endpoint, &body) {
            Ok(page) => page,
            Err(e) => {
                self.state = PageState::Done;
                return Some(Err(e));
            }
        };
        self.state = match self.cursor_of(&page) {
            Some(token) => PageState::Next(token),
            None => PageState::Done,
        };
        Some(Ok(page))
    }
}

/// Flatten a JSON object into cirrus form fields. Nulls are dropped (the
/// legacy API treats absent and null criteria the same), scalars are
/// stringified.
fn form_fields(body: &Value) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    if let Some(obj) = body.as_object() {
        for (k, v) in obj {
            match v {
                Value::Null => {}
                Value::String(s) => {
                    fields.insert(k.clone(), s.clone());
                }
                other => {
                    fields.insert(k.clone(), other.to_string());
                }
            }
        }
    }
    fields
}
