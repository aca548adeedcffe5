//! One-shot messages carried across a redirect in a signed cookie.

use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

pub const FLASH_COOKIE: &str = "flash";

pub fn set_flash(jar: SignedCookieJar, message: &str) -> SignedCookieJar {
    let encoded = utf8_percent_encode(message, NON_ALPHANUMERIC).to_string();
    jar.add(
        Cookie::build((FLASH_COOKIE, encoded))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Read the pending message, if any, and clear it so it shows only once.
pub fn take_flash(jar: SignedCookieJar) -> (SignedCookieJar, Option<String>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let message = percent_decode_str(cookie.value())
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
        .filter(|decoded| !decoded.is_empty());

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), message)
}
