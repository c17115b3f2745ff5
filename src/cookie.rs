//! Cookie options and `Set-Cookie` serialisation.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::Sha256;
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use crate::error::Error;

/// Characters left untouched when encoding a cookie value, the same set a
/// browser's `encodeURIComponent` keeps.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The `SameSite` cookie attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax    => "Lax",
            Self::None   => "None",
        }
    }
}

/// Attributes attached to a cookie by [`cookie`](crate::middleware::cookie)
/// and [`clear_cookie`](crate::middleware::clear_cookie).
///
/// `Default` sets no attribute at all; the path falls back to `/` when the
/// cookie is written.
///
/// ```rust
/// use std::time::Duration;
/// use weft::{CookieOptions, SameSite};
///
/// let options = CookieOptions::new()
///     .http_only(true)
///     .max_age(Duration::from_secs(3600))
///     .same_site(SameSite::Lax);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CookieOptions {
    pub expires: Option<OffsetDateTime>,
    pub domain: Option<String>,
    pub http_only: bool,
    /// Also sets `Expires` to now + `max_age` when written.
    pub max_age: Option<Duration>,
    pub path: Option<String>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
    /// Sign the value with the app's cookie secret.
    pub signed: bool,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expires(mut self, at: OffsetDateTime) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn signed(mut self, on: bool) -> Self {
        self.signed = on;
        self
    }
}

/// Builds a `Set-Cookie` header value as of `now`.
pub(crate) fn serialize(
    name: &str,
    value: &str,
    options: &CookieOptions,
    secret: Option<&str>,
    now: OffsetDateTime,
) -> Result<String, Error> {
    let invalid = || Error::InvalidCookie { name: name.to_owned() };

    if name.is_empty() || !name.bytes().all(is_token) {
        return Err(invalid());
    }

    let value = if options.signed {
        let secret = secret.ok_or_else(|| Error::MissingCookieSecret { name: name.to_owned() })?;
        format!("s:{}", sign(value, secret).ok_or_else(invalid)?)
    } else {
        value.to_owned()
    };

    let mut out = format!("{name}={}", utf8_percent_encode(&value, COOKIE_VALUE));

    let mut expires = options.expires;
    if let Some(age) = options.max_age {
        out.push_str(&format!("; Max-Age={}", age.as_secs()));
        let age = time::Duration::try_from(age).map_err(|_| invalid())?;
        expires = Some(now.checked_add(age).ok_or_else(invalid)?);
    }
    if let Some(domain) = &options.domain {
        if !is_attribute(domain) {
            return Err(invalid());
        }
        out.push_str(&format!("; Domain={domain}"));
    }
    let path = options.path.as_deref().unwrap_or("/");
    if !is_attribute(path) {
        return Err(invalid());
    }
    out.push_str(&format!("; Path={path}"));
    if let Some(at) = expires {
        let date = at
            .to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
            ))
            .map_err(|_| invalid())?;
        out.push_str(&format!("; Expires={date}"));
    }
    if options.http_only {
        out.push_str("; HttpOnly");
    }
    if options.secure {
        out.push_str("; Secure");
    }
    if let Some(same_site) = options.same_site {
        out.push_str(&format!("; SameSite={}", same_site.as_str()));
    }

    Ok(out)
}

/// Options that expire a cookie immediately.
pub(crate) fn expired(options: &CookieOptions) -> CookieOptions {
    CookieOptions {
        expires: Some(OffsetDateTime::UNIX_EPOCH + Duration::from_millis(1)),
        max_age: None,
        ..options.clone()
    }
}

/// `value.signature`, HMAC-SHA256 in unpadded base64.
fn sign(value: &str, secret: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(value.as_bytes());
    let signature = STANDARD_NO_PAD.encode(mac.finalize().into_bytes());
    Some(format!("{value}.{signature}"))
}

fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn is_attribute(s: &str) -> bool {
    s.bytes().all(|b| (0x20..0x7f).contains(&b) && b != b';')
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn now() -> OffsetDateTime {
        datetime!(2024-03-01 12:00:00 UTC)
    }

    #[test]
    fn plain_cookie_defaults_path() {
        let header = serialize("sid", "abc", &CookieOptions::new(), None, now()).unwrap();
        assert_eq!(header, "sid=abc; Path=/");
    }

    #[test]
    fn attributes_follow_set_cookie_order() {
        let options = CookieOptions::new()
            .domain("example.com")
            .path("/app")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict);
        let header = serialize("sid", "a b", &options, None, now()).unwrap();
        assert_eq!(
            header,
            "sid=a%20b; Domain=example.com; Path=/app; HttpOnly; Secure; SameSite=Strict"
        );
    }

    #[test]
    fn max_age_sets_expiry_from_now() {
        let options = CookieOptions::new().max_age(Duration::from_millis(90_500));
        let header = serialize("sid", "x", &options, None, now()).unwrap();
        assert_eq!(header, "sid=x; Max-Age=90; Path=/; Expires=Fri, 01 Mar 2024 12:01:30 GMT");
    }

    #[test]
    fn unrepresentable_expiry_is_rejected() {
        for age in [Duration::from_secs(u64::MAX / 2), Duration::MAX] {
            let options = CookieOptions::new().max_age(age);
            let err = serialize("sid", "x", &options, None, now()).unwrap_err();
            assert!(matches!(err, Error::InvalidCookie { name } if name == "sid"));
        }
    }

    #[test]
    fn expired_options_point_at_epoch() {
        let options = expired(&CookieOptions::new().max_age(Duration::from_secs(60)));
        let header = serialize("sid", "", &options, None, now()).unwrap();
        assert_eq!(header, "sid=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn signed_cookie_needs_secret() {
        let options = CookieOptions::new().signed(true);
        let err = serialize("sid", "hello", &options, None, now()).unwrap_err();
        assert!(matches!(err, Error::MissingCookieSecret { .. }));

        let a = serialize("sid", "hello", &options, Some("one"), now()).unwrap();
        let b = serialize("sid", "hello", &options, Some("two"), now()).unwrap();
        assert!(a.starts_with("sid=s%3Ahello."));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_bad_names_and_attributes() {
        let options = CookieOptions::new();
        assert!(serialize("bad name", "x", &options, None, now()).is_err());
        assert!(serialize("", "x", &options, None, now()).is_err());
        let options = CookieOptions::new().path("/a;b");
        assert!(serialize("sid", "x", &options, None, now()).is_err());
    }
}
