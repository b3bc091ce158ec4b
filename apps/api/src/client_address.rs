use axum::http::HeaderMap;

/// Address reported when no proxy header identifies the client.
pub const UNKNOWN_CLIENT_ADDRESS: &str = "unknown";

/// Resolves the client address from proxy headers.
///
/// Checks the first `x-forwarded-for` entry, then `cf-connecting-ip`, then
/// `x-real-ip`.
pub fn client_address(headers: &HeaderMap) -> String {
    let forwarded_for = header_value(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    forwarded_for
        .or_else(|| header_value(headers, "cf-connecting-ip"))
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or(UNKNOWN_CLIENT_ADDRESS)
        .to_owned()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
