//! Credential handling for the sign-in flow.
//!
//! Credentials are either supplied eagerly or produced by a deferred
//! provider (e.g. an interactive prompt). The provider is invoked at most
//! once per session-establishment attempt and the resolved pair is cached
//! only for the remainder of that attempt, so prompted or rotating
//! credentials stay correct across repeated logins.

use std::fmt;

/// An email/password pair for the sign-in portal.
///
/// Never logged or persisted by this crate; only transmitted over the
/// login transport. The `Debug` impl redacts both fields.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of credentials for session establishment.
///
/// `Deferred` holds a capability, not a value: the closure is called at
/// most once per establishment attempt, on first need (i.e. never on the
/// cached fast path).
pub enum CredentialSource {
    /// A fixed pair, supplied up front.
    Fixed(Credentials),
    /// A provider invoked on demand, e.g. a terminal prompt.
    Deferred(Box<dyn Fn() -> Credentials + Send + Sync>),
}

impl CredentialSource {
    /// Fixed credentials from an email/password pair.
    pub fn fixed(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Fixed(Credentials::new(email, password))
    }

    /// Deferred credentials from a zero-argument provider.
    pub fn deferred(provider: impl Fn() -> Credentials + Send + Sync + 'static) -> Self {
        Self::Deferred(Box::new(provider))
    }

    pub(crate) fn resolve(&self) -> Credentials {
        match self {
            Self::Fixed(c) => c.clone(),
            Self::Deferred(f) => f(),
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(_) => f.write_str("CredentialSource::Fixed(<redacted>)"),
            Self::Deferred(_) => f.write_str("CredentialSource::Deferred(..)"),
        }
    }
}
