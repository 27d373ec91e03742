//! Helpers for the `Cookie` and `Set-Cookie` headers carrying session credentials.

/// Cookie holding the short-lived bearer credential.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie holding the long-lived refresh credential.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Looks up a cookie by name in a `Cookie` request header value.
///
/// Empty values are treated as absent. Surrounding double quotes are stripped.
///
/// # Examples
///
/// ```
/// use trawl_common::cookie::cookie_value;
///
/// let header = "theme=dark; refreshToken=\"r-1\"; accessToken=";
/// assert_eq!(cookie_value(header, "refreshToken"), Some("r-1"));
/// assert_eq!(cookie_value(header, "accessToken"), None);
/// ```
#[must_use]
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(split_pair)
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Extracts the leading `name=value` pair from a `Set-Cookie` header value.
///
/// Attributes such as `Path` or `HttpOnly` are ignored.
///
/// # Examples
///
/// ```
/// use trawl_common::cookie::parse_set_cookie;
///
/// assert_eq!(
///     parse_set_cookie("accessToken=abc; Path=/; HttpOnly"),
///     Some(("accessToken", "abc"))
/// );
/// assert_eq!(parse_set_cookie("garbage"), None);
/// ```
#[must_use]
pub fn parse_set_cookie(header: &str) -> Option<(&str, &str)> {
    header.split(';').next().and_then(split_pair)
}

/// Builds a `Cookie` request header from name/value pairs.
#[must_use]
pub fn cookie_header<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds a `Set-Cookie` response header value for a session cookie.
#[must_use]
pub fn set_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax")
}

fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (key, value) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some((key, value))
}
