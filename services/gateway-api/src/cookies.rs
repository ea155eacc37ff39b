//! Auth cookies
//!
//! Both tokens live in `HttpOnly` cookies scoped to `/` and expire with the
//! refresh token.

use axum::http::header::{self, HeaderMap, HeaderValue};
use chrono::{DateTime, TimeZone, Utc};
use warden_types::TokenPair;

pub const ACCESS_TOKEN: &str = "accessToken";
pub const REFRESH_TOKEN: &str = "refreshToken";

/// `Set-Cookie` values storing a token pair
pub fn set_tokens(tokens: &TokenPair, secure: bool) -> [(header::HeaderName, String); 2] {
    let expires = http_date(tokens.refresh_token_expired_after);
    [
        (header::SET_COOKIE, cookie(ACCESS_TOKEN, &tokens.access_token, &expires, secure)),
        (header::SET_COOKIE, cookie(REFRESH_TOKEN, &tokens.refresh_token, &expires, secure)),
    ]
}

/// `Set-Cookie` values removing both tokens
pub fn clear_tokens(secure: bool) -> [(header::HeaderName, String); 2] {
    let expires = http_date(0);
    [
        (header::SET_COOKIE, cookie(ACCESS_TOKEN, "", &expires, secure)),
        (header::SET_COOKIE, cookie(REFRESH_TOKEN, "", &expires, secure)),
    ]
}

fn cookie(name: &str, value: &str, expires: &str, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; HttpOnly; Path=/; SameSite=Lax; Expires={expires}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// RFC 7231 date for a Unix millisecond timestamp
fn http_date(millis: i64) -> String {
    let at: DateTime<Utc> = Utc
        .timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Value of the named cookie, if the request carries it
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value: &HeaderValue| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cookie_shape() {
        let tokens = TokenPair {
            access_token: "a.b.c".into(),
            refresh_token: "d.e.f".into(),
            access_token_expired_after: 0,
            refresh_token_expired_after: 1_700_000_000_000,
        };
        let [(_, access), (_, refresh)] = set_tokens(&tokens, true);
        assert_eq!(
            access,
            "accessToken=a.b.c; HttpOnly; Path=/; SameSite=Lax; Expires=Tue, 14 Nov 2023 22:13:20 GMT; Secure"
        );
        assert!(refresh.starts_with("refreshToken=d.e.f;"));
    }

    #[test]
    fn test_clear_expires_in_the_past() {
        let [(_, access), _] = clear_tokens(false);
        assert_eq!(
            access,
            "accessToken=; HttpOnly; Path=/; SameSite=Lax; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=r1; accessToken="),
        );
        assert_eq!(read(&headers, REFRESH_TOKEN), Some("r1".to_string()));
        assert_eq!(read(&headers, ACCESS_TOKEN), None);
        assert_eq!(read(&headers, "missing"), None);
    }
}
