//! Durable cookie jar, persisted as a JSON file on disk.
//!
//! The jar is keyed by `(domain, name)` and stored, by default, at
//! `~/.amazon-music-cookies.json`. It is reloaded verbatim at startup and
//! saved after any network exchange that carried `Set-Cookie`.
//!
//! One reserved pseudo-cookie, `REGION_TARGET`, stores the regional
//! target URL discovered during the first successful login (e.g.
//! `https://music.amazon.co.uk`). It is never sent to the server; it only
//! saves a region-discovery round trip on later runs.

use crate::error::{AmazonMusicError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the reserved pseudo-cookie holding the regional target URL.
pub const REGION_TARGET: &str = "REGION_TARGET";

const DEFAULT_FILE: &str = ".amazon-music-cookies.json";

/// A single stored cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Owning domain, without any leading dot.
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry as unix seconds; `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl Cookie {
    fn is_expired(&self, now: i64) -> bool {
        self.expires.is_some_and(|t| t <= now)
    }
}

/// Keyed cookie store with file persistence.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CookieJar {
    #[serde(skip)]
    path: Option<PathBuf>,
    entries: BTreeMap<String, Cookie>,
}

impl CookieJar {
    /// Default jar location: a dot-file in the user's home directory.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AmazonMusicError::Other("cannot determine home directory".into()))?;
        Ok(home.join(DEFAULT_FILE))
    }

    /// Load a jar from `path`, or start empty if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let mut jar = if path.exists() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str::<Self>(&data)?
        } else {
            Self::default()
        };
        jar.path = Some(path.to_path_buf());
        Ok(jar)
    }

    /// An in-memory jar that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Persist the jar. A no-op for in-memory jars.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Delete the backing file, if any.
    pub fn clear_file(&self) -> Result<()> {
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, domain: &str, name: &str) -> Option<&Cookie> {
        self.entries.get(&key(domain, name))
    }

    pub fn set(&mut self, cookie: Cookie) {
        self.entries.insert(key(&cookie.domain, &cookie.name), cookie);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a `Set-Cookie` header received from `host`.
    /// Unparseable headers are ignored.
    pub(crate) fn store_set_cookie(&mut self, host: &str, raw: &str) {
        if let Some(cookie) = parse_set_cookie(host, raw) {
            self.set(cookie);
        }
    }

    /// Build the `Cookie` request-header value for `host`, skipping
    /// expired entries and the `REGION_TARGET` pseudo-cookie.
    pub(crate) fn header_for(&self, host: &str) -> Option<String> {
        let now = Utc::now().timestamp();
        let pairs: Vec<String> = self
            .entries
            .values()
            .filter(|c| c.name != REGION_TARGET)
            .filter(|c| !c.is_expired(now))
            .filter(|c| domain_matches(host, &c.domain))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// The remembered regional target URL, if any.
    pub fn region_target(&self) -> Option<&str> {
        self.entries
            .get(&key("", REGION_TARGET))
            .map(|c| c.value.as_str())
    }

    /// Remember the regional target URL discovered at login.
    pub fn set_region_target(&mut self, url: &str) {
        self.set(Cookie {
            name: REGION_TARGET.to_owned(),
            value: url.to_owned(),
            domain: String::new(),
            path: None,
            expires: None,
            secure: false,
            http_only: false,
        });
    }
}

fn key(domain: &str, name: &str) -> String {
    format!("{domain}\t{name}")
}

/// RFC 6265 domain-match: exact host, or host is a subdomain of the
/// cookie domain.
fn domain_matches(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Parse a `Set-Cookie` header value into a [`Cookie`].
///
/// Best-effort: covers the attributes the service actually sends
/// (`Expires`, `Max-Age`, `Domain`, `Path`, `Secure`, `HttpOnly`).
fn parse_set_cookie(host: &str, raw: &str) -> Option<Cookie> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.trim().split_once('=')?;
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie {
        name: name.trim().to_owned(),
        value: value.trim().to_owned(),
        domain: host.to_owned(),
        path: None,
        expires: None,
        secure: false,
        http_only: false,
    };

    for part in parts {
        let part = part.trim();
        let (attr, attr_value) = match part.split_once('=') {
            Some((a, v)) => (a.trim(), v.trim()),
            None => (part, ""),
        };
        match attr.to_ascii_lowercase().as_str() {
            "expires" => {
                // Max-Age wins if both are present
                if cookie.expires.is_none() {
                    cookie.expires = parse_cookie_date(attr_value);
                }
            }
            "max-age" => {
                if let Ok(secs) = attr_value.parse::<i64>() {
                    cookie.expires = Some(Utc::now().timestamp() + secs);
                }
            }
            "domain" => {
                let d = attr_value.trim_start_matches('.');
                if !d.is_empty() {
                    cookie.domain = d.to_owned();
                }
            }
            "path" => cookie.path = Some(attr_value.to_owned()),
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            _ => {}
        }
    }
    Some(cookie)
}

/// Parse a cookie expiry date to unix seconds. Amazon sends both the
/// RFC 1123 form and the legacy hyphenated form.
fn parse_cookie_date(s: &str) -> Option<i64> {
    const FORMATS: [&str; 2] = ["%a, %d %b %Y %H:%M:%S GMT", "%a, %d-%b-%Y %H:%M:%S GMT"];
    FORMATS.iter().find_map(|fmt| {
        chrono::NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|dt| dt.and_utc().timestamp())
    })
}
