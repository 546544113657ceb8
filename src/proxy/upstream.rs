use actix_web::http::header::HeaderMap as InboundHeaders;
use reqwest::{
    header::{HeaderValue, HOST},
    redirect::Policy,
    Client, Proxy, Request, Response,
};
use tokio::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::{
    config::ProxyConfig,
    error::{AppError, AppResult},
    proxy::headers::relayed_request_headers,
};

const MAX_REDIRECTS: usize = 10;

/// Outbound side of the relay: owns the shared HTTP client used for every
/// upstream fetch.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    playlist_buffer_size: usize,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> AppResult<Self> {
        let redirect = if config.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(redirect);

        if config.request_timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout));
        }

        builder = match &config.proxy_url {
            Some(proxy_url) => {
                let proxy = Proxy::all(proxy_url).map_err(|e| {
                    AppError::Internal(format!("Invalid proxy URL {}: {}", proxy_url, e))
                })?;
                info!("Routing upstream requests through {}", proxy_url);
                builder.proxy(proxy)
            }
            // reqwest picks up the proxy environment variables by default
            None if config.system_proxy => builder,
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            playlist_buffer_size: config.playlist_buffer_size,
        })
    }

    /// Builds the GET request for `target`, carrying over the relayable inbound
    /// headers. `Host` always names the target authority.
    pub fn build_request(&self, headers: &InboundHeaders, target: &Url) -> AppResult<Request> {
        let mut request = self
            .client
            .get(target.clone())
            .headers(relayed_request_headers(headers))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build upstream request: {}", e)))?;

        // See https://www.mnot.net/blog/2011/07/11/what_proxies_must_do.html#3-route-well
        let host = HeaderValue::from_str(&authority(target))
            .map_err(|e| AppError::Internal(format!("Invalid upstream host: {}", e)))?;
        request.headers_mut().insert(HOST, host);

        info!("GET {}", request.url());
        for (name, value) in request.headers() {
            debug!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }

        Ok(request)
    }

    /// Sends the request and resolves once the response headers are in.
    pub async fn send(&self, request: Request) -> AppResult<Response> {
        let url = request.url().clone();
        let response = self.client.execute(request).await.map_err(|e| {
            tracing::error!("Upstream request to {} failed: {}", url, e);
            AppError::Upstream(e)
        })?;

        debug!("Upstream {} answered {}", url, response.status());
        Ok(response)
    }

    pub fn playlist_buffer_size(&self) -> usize {
        self.playlist_buffer_size
    }
}

/// Host and, when not the scheme default, port of `url`.
pub fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
