//! Session cookie handling
//!
//! HMAC signing of the session id and construction of the `Set-Cookie`
//! value from [`CookieSettings`].

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use http::HeaderMap;
use http::header::COOKIE;
use sha2::{Digest, Sha256};
use std::fmt;

use sk_core::{CookieSettings, SameSitePolicy, SessionId};

type HmacSha256 = Hmac<Sha256>;

/// Signs session ids so clients cannot pick their own
#[derive(Clone)]
pub struct CookieSigner {
    key: [u8; 32],
}

impl fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

impl CookieSigner {
    /// Derive the signing key from a secret
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC accepts any key size")
    }

    /// Cookie value for an id: `{id}.{signature}`
    pub fn sign(&self, id: &SessionId) -> String {
        let mut mac = self.mac();
        mac.update(id.as_str().as_bytes());
        let signature = mac.finalize().into_bytes();
        format!("{}.{}", id, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Check a signed cookie value and return the id it carries
    pub fn verify(&self, value: &str) -> Option<SessionId> {
        let (id, signature) = value.rsplit_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        SessionId::parse(id)
    }
}

/// Value of the named cookie in the request headers, if any
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value).filter_map(|cookie| cookie.ok()))
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    }
}

/// Build the outbound session cookie
pub fn session_cookie(settings: &CookieSettings, value: String) -> Cookie<'static> {
    let mut builder = Cookie::build((settings.name.clone(), value))
        .path(settings.path.clone())
        .http_only(settings.http_only)
        .secure(settings.secure)
        .same_site(same_site(settings.same_site));

    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }

    if let Some(secs) = settings.max_age_secs {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        builder = builder.max_age(time::Duration::seconds(secs));
    }

    builder.build()
}
