use actix_web::{
    body::SizedStream,
    http::StatusCode,
    web::{self},
    HttpRequest, HttpResponse, HttpResponseBuilder,
};
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, CONTENT_TYPE},
    Response,
};
use url::Url;

use crate::{
    error::{AppError, AppResult},
    models::RelayQuery,
    proxy::{
        headers::relayed_response_headers, playlist::PlaylistRewriter, target::validate_target,
        upstream::UpstreamClient,
    },
};

pub const HLS_MEDIA_TYPES: &[&str] = &[
    "application/x-mpegurl",
    "audio/mpegurl",
    "application/vnd.apple.mpegurl",
];

// Upper bound for the 2x Content-Length preallocation
const MAX_PLAYLIST_PREALLOCATION: usize = 8 * 1024 * 1024;

/// `GET /{anything}?url=<target>[&code=<code>]`
///
/// Fetches the target and relays the response. HLS playlists are rewritten so
/// that every reference they contain is fetched through this proxy as well.
pub async fn relay(
    req: HttpRequest,
    query: web::Query<Vec<(String, String)>>,
    upstream: web::Data<UpstreamClient>,
) -> AppResult<HttpResponse> {
    let query = RelayQuery::from_pairs(query.into_inner());
    let target = validate_target(&query.urls)?;

    let proxy_authority = {
        let info = req.connection_info();
        format!("{}://{}", info.scheme(), info.host())
    };

    let request = upstream.build_request(req.headers(), &target)?;
    let response = upstream.send(request).await?;

    if is_playlist(response.headers()) {
        relay_playlist(
            response,
            target,
            proxy_authority,
            query.access_code(),
            upstream.playlist_buffer_size(),
        )
        .await
    } else {
        Ok(relay_direct(response))
    }
}

/// Whether the upstream media type is one of the HLS playlist types.
pub fn is_playlist(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .is_some_and(|media_type| {
            HLS_MEDIA_TYPES
                .iter()
                .any(|hls| hls.eq_ignore_ascii_case(media_type))
        })
}

fn response_builder(response: &Response) -> HttpResponseBuilder {
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    for (name, value) in relayed_response_headers(response.headers()).iter() {
        builder.append_header((name.clone(), value.clone()));
    }
    builder
}

/// Streams the upstream body untouched, keeping its length when known.
fn relay_direct(response: Response) -> HttpResponse {
    let mut builder = response_builder(&response);
    let content_length = response.content_length();
    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(AppError::from));

    match content_length {
        Some(length) => builder.body(SizedStream::new(length, body)),
        None => builder.streaming(body),
    }
}

/// Rewrites the whole playlist before answering, as its length changes.
async fn relay_playlist(
    response: Response,
    base: Url,
    proxy_authority: String,
    code: Option<&str>,
    default_capacity: usize,
) -> AppResult<HttpResponse> {
    let mut builder = response_builder(&response);
    let capacity = response
        .content_length()
        .and_then(|length| usize::try_from(length).ok())
        .map(|length| length.saturating_mul(2).min(MAX_PLAYLIST_PREALLOCATION))
        .unwrap_or(default_capacity);

    let body = PlaylistRewriter::new(base, proxy_authority, code)
        .rewrite_stream(response.bytes_stream(), capacity)
        .await?;

    tracing::debug!("Rewrote playlist into {} bytes", body.len());
    Ok(builder.body(body))
}
