//! Session establishment: the credential-driven login handshake.
//!
//! The service expects a real browser: a multi-step sign-in flow,
//! region-specific redirection, and client configuration embedded in the
//! returned HTML. The handshake here mirrors what the web player does:
//!
//! 1. Fast path: if the cookie jar remembers a regional target URL
//!    (`REGION_TARGET`) and still holds live session cookies, fetching
//!    that target yields the configuration page directly and no login
//!    POST is issued.
//! 2. Otherwise the generic front door is fetched; redirects through
//!    `/ap/signin` trigger the form-submission loop (email and password
//!    may be asked on separate screens).
//! 3. The `amznMusic.appConfig` object is extracted from the final page
//!    and the session is assembled from it; the resolved regional target
//!    is persisted back into the jar.

use crate::cookies::CookieJar;
use crate::credentials::{CredentialSource, Credentials};
use crate::error::{AmazonMusicError, Result};
use crate::html;
use crate::transport::{self, Exchange};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde_json::Value;

pub(crate) const FRONT_DOOR: &str = "https://music.amazon.com";
const FORCE_SIGNIN_PATH: &str = "/gp/dmusic/cloudplayer/forceSignIn";

/// Sign-in form submissions per establishment attempt before giving up.
const MAX_LOGIN_STEPS: usize = 5;
/// Config-page fetches (including forced re-sign-in) before giving up.
const MAX_CONFIG_FETCHES: usize = 3;

/// Overrides for realm -> region where the realm's first two characters
/// can't be used, taken from the web player's digitalMusicPlayer config.
fn region_for_realm(realm: &str) -> String {
    match realm {
        "USAmazon" => "NA".to_owned(),
        "EUAmazon" => "EU".to_owned(),
        "FEAmazon" => "FE".to_owned(),
        other => other.get(..2).unwrap_or(other).to_owned(),
    }
}

/// An established, authenticated session.
///
/// Created once per process by [`establish`]; immutable thereafter.
/// Cookies live in the [`CookieJar`] owned by the client, which may be
/// refreshed by later calls (token rotation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Realm code used as the URL prefix, e.g. `EU` or `NA`.
    pub region: String,
    /// Regional server base, e.g. `https://music.amazon.co.uk`.
    pub base_url: String,
    /// Anti-forgery token triple sent on every API call.
    pub csrf_token: String,
    pub csrf_ts: String,
    pub csrf_rnd: String,
    pub device_id: String,
    pub device_type: String,
    pub customer_id: String,
    /// Music territory, e.g. `GB`.
    pub territory: String,
    /// UI locale, e.g. `en_GB`.
    pub locale: String,
}

impl Session {
    /// The regional path prefix API calls are made under, e.g. `/EU/`.
    pub fn region_prefix(&self) -> String {
        format!("/{}/", self.region)
    }
}

/// Run the login handshake and return a live [`Session`].
///
/// Tries the remembered regional target first (no login POST when the
/// cached cookies are still valid), falling back to the full front-door
/// flow on structural failure. Network failures are never retried here;
/// they propagate as [`Transport`](AmazonMusicError::Transport).
pub(crate) fn establish(
    http: &Client,
    jar: &mut CookieJar,
    credentials: &CredentialSource,
    front_door: &str,
) -> Result<Session> {
    if let Some(target) = jar.region_target().map(str::to_owned) {
        if target != front_door {
            debug!("trying cached regional target");
            match establish_at(http, jar, credentials, &target, front_door) {
                Ok(session) => return Ok(session),
                Err(
                    e @ (AmazonMusicError::Transport(_)
                    | AmazonMusicError::Authentication
                    | AmazonMusicError::ChallengeRequired),
                ) => return Err(e),
                Err(e) => warn!("cached regional target failed ({e}), retrying via front door"),
            }
        }
    }
    establish_at(http, jar, credentials, front_door, front_door)
}

fn establish_at(
    http: &Client,
    jar: &mut CookieJar,
    credentials: &CredentialSource,
    target: &str,
    front_door: &str,
) -> Result<Session> {
    let mut exchange = transport::fetch(http, jar, target, None)?;
    jar.save()?;

    // Credentials resolved at most once per attempt, on first need.
    let mut resolved: Option<Credentials> = None;

    for _ in 0..MAX_CONFIG_FETCHES {
        let mut steps = 0;
        while exchange.saw_signin || html::is_login_page(&exchange.body) {
            steps += 1;
            if steps > MAX_LOGIN_STEPS {
                return Err(AmazonMusicError::Authentication);
            }
            exchange = authenticate(http, jar, &exchange, credentials, &mut resolved)?;
        }

        if html::has_captcha(&exchange.body) {
            return Err(AmazonMusicError::ChallengeRequired);
        }

        let Some(config) = html::extract_app_config(&exchange.body) else {
            return Err(AmazonMusicError::RegionResolution(
                "appConfig not found in configuration page".into(),
            ));
        };

        // An anonymous (unrecognized) config page means the cookies got
        // us a page without a session; force a fresh sign-in.
        if config.get("isRecognizedCustomer").and_then(Value::as_i64) == Some(0) {
            debug!("customer not recognized, forcing sign-in");
            let url = format!("{front_door}{FORCE_SIGNIN_PATH}");
            exchange = transport::fetch(http, jar, &url, Some(&exchange.final_url.to_string()))?;
            jar.save()?;
            continue;
        }

        let session = session_from_config(&config)?;
        jar.set_region_target(&session.base_url);
        jar.save()?;
        debug!("session established for region {}", session.region);
        return Ok(session);
    }
    Err(AmazonMusicError::RegionResolution(
        "sign-in loop did not converge".into(),
    ))
}

/// Handle one step of the sign-in form flow: copy hidden fields, fill in
/// whichever credential fields the form asks for, and submit.
fn authenticate(
    http: &Client,
    jar: &mut CookieJar,
    page: &Exchange,
    credentials: &CredentialSource,
    resolved: &mut Option<Credentials>,
) -> Result<Exchange> {
    if html::has_captcha(&page.body) {
        return Err(AmazonMusicError::ChallengeRequired);
    }
    if html::has_auth_error(&page.body) {
        return Err(AmazonMusicError::Authentication);
    }
    let form = html::extract_form(&page.body).ok_or(AmazonMusicError::Authentication)?;

    let creds = resolved.get_or_insert_with(|| credentials.resolve());
    let mut fields = form.hidden.clone();
    if let Some(name) = &form.email_field {
        fields.insert(name.clone(), creds.email.clone());
    }
    if let Some(name) = &form.password_field {
        fields.insert(name.clone(), creds.password.clone());
    }
    debug!(
        "submitting sign-in form ({} hidden fields, email: {}, password: {})",
        form.hidden.len(),
        form.email_field.is_some(),
        form.password_field.is_some(),
    );

    let action = page.final_url.join(&form.action).map_err(|e| {
        AmazonMusicError::RegionResolution(format!("bad form action {}: {e}", form.action))
    })?;
    let referer = page.final_url.to_string();
    let exchange = transport::submit(http, jar, action.as_str(), &fields, Some(&referer))?;
    jar.save()?;
    Ok(exchange)
}

/// Assemble a [`Session`] from the embedded configuration object.
/// Any missing required field is a region-resolution failure, distinct
/// from rejected credentials.
fn session_from_config(config: &Value) -> Result<Session> {
    let realm = required(config, "/realm")?;
    let server = required(config, "/serverInfo/returnUrlServer")?;
    let base_url = if server.starts_with("http://") || server.starts_with("https://") {
        server
    } else {
        format!("https://{server}")
    };

    Ok(Session {
        region: region_for_realm(&realm),
        base_url,
        csrf_token: required(config, "/CSRFTokenConfig/csrf_token")?,
        csrf_ts: required(config, "/CSRFTokenConfig/csrf_ts")?,
        csrf_rnd: required(config, "/CSRFTokenConfig/csrf_rnd")?,
        device_id: required(config, "/deviceId")?,
        device_type: required(config, "/deviceType")?,
        customer_id: required(config, "/customerId")?,
        territory: required(config, "/musicTerritory")?,
        locale: required(config, "/i18n/locale")?,
    })
}

/// Look up a required config value, accepting strings and numbers (the
/// CSRF timestamp is served as a number on some portal variants).
fn required(config: &Value, pointer: &str) -> Result<String> {
    match config.pointer(pointer) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(AmazonMusicError::RegionResolution(format!(
            "appConfig missing required field {pointer}"
        ))),
    }
}
