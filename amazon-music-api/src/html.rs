//! Best-effort structural extraction from the service's HTML pages.
//!
//! The sign-in portal and the player shell are not stable documents:
//! field names, element ids and markup drift over time. Everything here
//! therefore keys off stable marker tokens (the `appConfig` assignment,
//! the presence of email/password inputs, known error-box ids) rather
//! than strict DOM paths, and is isolated in this module so markup drift
//! requires changing one place.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Marker preceding the embedded client configuration JSON.
const APP_CONFIG_MARKER: &str = "appConfig = ";

/// Marker present on the audio-CAPTCHA challenge page.
const CAPTCHA_MARKER: &str = "audio-captcha";

/// Error box shown by the sign-in portal for rejected credentials.
const AUTH_ERROR_MARKER: &str = "auth-error-message-box";

static FORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b[^>]*>.*?</form>").expect("static regex"));
static INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("static regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-zA-Z][a-zA-Z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("static regex")
});

/// Extract the script-embedded `amznMusic.appConfig` JSON object.
///
/// Scans for the assignment marker and decodes exactly one JSON value
/// from the first `{` that follows, so trailing `;` and the rest of the
/// script are ignored.
pub(crate) fn extract_app_config(html: &str) -> Option<Value> {
    let at = html.find(APP_CONFIG_MARKER)?;
    let rest = &html[at..];
    let start = rest.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&rest[start..]).into_iter::<Value>();
    stream.next()?.ok()
}

/// An HTML form found on a portal page.
#[derive(Debug)]
pub(crate) struct Form {
    /// `action` attribute, possibly relative.
    pub action: String,
    /// Hidden fields, to be copied into the submission verbatim.
    pub hidden: BTreeMap<String, String>,
    /// Name of the email input, when the form asks for one.
    pub email_field: Option<String>,
    /// Name of the password input, when the form asks for one.
    pub password_field: Option<String>,
}

impl Form {
    /// Whether this form is asking for credentials.
    pub fn wants_credentials(&self) -> bool {
        self.email_field.is_some() || self.password_field.is_some()
    }
}

/// Extract the first form on the page, detecting email/password inputs
/// structurally (by `type`, falling back to name hints) rather than by
/// exact field name.
pub(crate) fn extract_form(html: &str) -> Option<Form> {
    let form_html = FORM_RE.find(html)?.as_str();
    let open_tag_end = form_html.find('>')?;
    let form_attrs = attributes(&form_html[..=open_tag_end]);

    let mut form = Form {
        action: form_attrs.get("action").cloned().unwrap_or_default(),
        hidden: BTreeMap::new(),
        email_field: None,
        password_field: None,
    };

    for input in INPUT_RE.find_iter(form_html) {
        let attrs = attributes(input.as_str());
        let Some(name) = attrs.get("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let input_type = attrs.get("type").map_or("text", String::as_str);
        match input_type.to_ascii_lowercase().as_str() {
            "hidden" => {
                form.hidden
                    .insert(name.clone(), attrs.get("value").cloned().unwrap_or_default());
            }
            "password" => form.password_field = Some(name.clone()),
            "email" => form.email_field = Some(name.clone()),
            _ => {
                // Amazon serves the email input as type="text" on some
                // variants of the portal; fall back to the field name.
                if form.email_field.is_none() && name.to_ascii_lowercase().contains("email") {
                    form.email_field = Some(name.clone());
                }
            }
        }
    }
    Some(form)
}

/// Whether the page is (still) a sign-in page asking for credentials.
pub(crate) fn is_login_page(html: &str) -> bool {
    extract_form(html).is_some_and(|f| f.wants_credentials())
}

/// Whether the page is a CAPTCHA challenge.
pub(crate) fn has_captcha(html: &str) -> bool {
    html.contains(CAPTCHA_MARKER)
}

/// Whether the page reports rejected credentials.
pub(crate) fn has_auth_error(html: &str) -> bool {
    html.contains(AUTH_ERROR_MARKER)
}

fn attributes(tag: &str) -> BTreeMap<String, String> {
    ATTR_RE
        .captures_iter(tag)
        .map(|cap| {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map_or(String::new(), |m| m.as_str().to_owned());
            (cap[1].to_ascii_lowercase(), value)
        })
        .collect()
}
