//! HTTP plumbing for the sign-in handshake.
//!
//! The portal varies its behavior (including CAPTCHA challenges) based on
//! request headers, so every exchange presents headers indistinguishable
//! from a common desktop browser. Redirects are followed manually: the
//! client needs to capture `Set-Cookie` on every hop and to notice,
//! structurally, when a hop bounces through the sign-in portal.

use crate::cookies::CookieJar;
use crate::error::{AmazonMusicError, Result};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, LOCATION, REFERER, SET_COOKIE,
};
use reqwest::Url;
use std::collections::BTreeMap;

pub(crate) const SIGNIN_PATH: &str = "/ap/signin";

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str =
    "en-US,en-GB;q=0.7,chrome://global/locale/intl.properties;q=0.3";

const MAX_REDIRECTS: usize = 10;

/// A completed request/response exchange, after redirects.
pub(crate) struct Exchange {
    pub final_url: Url,
    pub status: StatusCode,
    pub body: String,
    /// Whether any hop redirected through the sign-in portal.
    pub saw_signin: bool,
}

/// GET `url` with browser-mimicry headers, following redirects.
pub(crate) fn fetch(
    http: &Client,
    jar: &mut CookieJar,
    url: &str,
    referer: Option<&str>,
) -> Result<Exchange> {
    let url = parse_url(url)?;
    let req = browser_request(http.get(url.clone()), jar, &url, referer);
    follow(http, jar, url, req.send()?)
}

/// POST `fields` as an URL-encoded form to `url`, then follow redirects.
pub(crate) fn submit(
    http: &Client,
    jar: &mut CookieJar,
    url: &str,
    fields: &BTreeMap<String, String>,
    referer: Option<&str>,
) -> Result<Exchange> {
    let url = parse_url(url)?;
    let body = urlencode_form(fields);
    let req = browser_request(http.post(url.clone()), jar, &url, referer)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body);
    follow(http, jar, url, req.send()?)
}

fn follow(
    http: &Client,
    jar: &mut CookieJar,
    mut url: Url,
    mut response: reqwest::blocking::Response,
) -> Result<Exchange> {
    let mut saw_signin = false;
    for _ in 0..MAX_REDIRECTS {
        store_cookies(jar, &url, &response);

        if !response.status().is_redirection() {
            return Ok(Exchange {
                final_url: url,
                status: response.status(),
                body: response.text()?,
                saw_signin,
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AmazonMusicError::RegionResolution("redirect without Location header".into())
            })?;
        let next = url.join(location).map_err(|e| {
            AmazonMusicError::RegionResolution(format!("bad redirect target {location}: {e}"))
        })?;
        saw_signin |= next.path().starts_with(SIGNIN_PATH);
        debug!("following redirect to {}{}", next.host_str().unwrap_or(""), next.path());

        let referer = url.to_string();
        url = next;
        response = browser_request(http.get(url.clone()), jar, &url, Some(&referer)).send()?;
    }
    Err(AmazonMusicError::RegionResolution(
        "redirect chain did not terminate".into(),
    ))
}

fn browser_request(
    req: RequestBuilder,
    jar: &CookieJar,
    url: &Url,
    referer: Option<&str>,
) -> RequestBuilder {
    let mut req = req
        .header(ACCEPT, BROWSER_ACCEPT)
        .header(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
        .header("Upgrade-Insecure-Requests", "1");
    if let Some(referer) = referer {
        req = req.header(REFERER, referer);
    }
    if let Some(cookie) = url.host_str().and_then(|h| jar.header_for(h)) {
        req = req.header(COOKIE, cookie);
    }
    req
}

pub(crate) fn store_cookies(jar: &mut CookieJar, url: &Url, response: &reqwest::blocking::Response) {
    let Some(host) = url.host_str() else { return };
    for value in response.headers().get_all(SET_COOKIE) {
        if let Ok(raw) = value.to_str() {
            jar.store_set_cookie(host, raw);
        }
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| AmazonMusicError::RegionResolution(format!("bad URL {url}: {e}")))
}

pub(crate) fn urlencode_form(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_encoding_escapes_reserved_characters() {
        let mut fields = BTreeMap::new();
        fields.insert("email".to_owned(), "foo@example.com".to_owned());
        fields.insert("password".to_owned(), "a&b=c".to_owned());
        let body = urlencode_form(&fields);
        assert_eq!(body, "email=foo%40example.com&password=a%26b%3Dc");
    }
}
