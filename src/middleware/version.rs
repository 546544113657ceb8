use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

/// `X-InformationalVersion`, lower-cased as header names are stored.
pub const VERSION_HEADER: &str = "x-informationalversion";

/// Build identifier, `BUILD_VERSION` at compile time or the package version.
pub const VERSION: &str = match option_env!("BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Stamps the build version on every response.
#[derive(Clone, Copy, Debug, Default)]
pub struct VersionHeader;

impl<S, B> Transform<S, ServiceRequest> for VersionHeader
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = VersionHeaderService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(VersionHeaderService { service }))
    }
}

pub struct VersionHeaderService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for VersionHeaderService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(version) = HeaderValue::from_str(VERSION) {
                res.headers_mut()
                    .insert(HeaderName::from_static(VERSION_HEADER), version);
            }
            Ok(res)
        })
    }
}
