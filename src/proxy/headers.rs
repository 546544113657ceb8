//! Hop-by-hop header handling, applied both to the request sent upstream and to
//! the response relayed back to the client.
//!
//! See <https://www.mnot.net/blog/2011/07/11/what_proxies_must_do.html#1-remove-hop-by-hop-headers>

use actix_web::http::header as inbound;
use reqwest::header::{self as outbound, HeaderMap, HeaderName, HeaderValue};

// https://datatracker.ietf.org/doc/html/draft-ietf-httpbis-p1-messaging-14#section-7.1.3.1
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Decides whether a header may be relayed to the next hop.
///
/// `connection` holds the lower-cased tokens of the message's `Connection`
/// header, each of which names an additional hop-by-hop header.
/// `Content-Length` is never relayed since the length of what this proxy
/// writes is set separately.
pub fn should_relay(name: &str, connection: &[String]) -> bool {
    if name.eq_ignore_ascii_case("content-length") {
        return false;
    }

    if HOP_BY_HOP_HEADERS
        .iter()
        .any(|header| header.eq_ignore_ascii_case(name))
    {
        return false;
    }

    !connection
        .iter()
        .any(|token| token.eq_ignore_ascii_case(name))
}

/// Splits `Connection` header values into lower-cased header name tokens.
pub fn connection_tokens<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    values
        .into_iter()
        .filter_map(|value| std::str::from_utf8(value).ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Copies the relayable inbound request headers into an upstream header map,
/// keeping every value of multi-valued headers.
pub fn relayed_request_headers(headers: &inbound::HeaderMap) -> HeaderMap {
    let connection = connection_tokens(
        headers
            .get_all(inbound::CONNECTION)
            .map(|value| value.as_bytes()),
    );

    let mut relayed = HeaderMap::new();
    for (name, value) in headers.iter() {
        if !should_relay(name.as_str(), &connection) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                relayed.append(name, value);
            }
            _ => tracing::warn!("Skipping unrelayable request header {}", name),
        }
    }
    relayed
}

/// Copies the relayable upstream response headers into a client header map.
pub fn relayed_response_headers(headers: &HeaderMap) -> inbound::HeaderMap {
    let connection = connection_tokens(
        headers
            .get_all(outbound::CONNECTION)
            .iter()
            .map(|value| value.as_bytes()),
    );

    let mut relayed = inbound::HeaderMap::new();
    for (name, value) in headers.iter() {
        if !should_relay(name.as_str(), &connection) {
            continue;
        }
        match (
            inbound::HeaderName::from_bytes(name.as_str().as_bytes()),
            inbound::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => relayed.append(name, value),
            _ => tracing::warn!("Skipping unrelayable response header {}", name),
        }
    }
    relayed
}
