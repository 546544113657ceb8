use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::error::{plain_text_failure, AppError};

/// Turns malformed-request errors raised outside the relay handler (query
/// decoding and other extractor failures) into the plain-text 400 body used
/// for every rejection.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextErrors;

impl<S, B> Transform<S, ServiceRequest> for PlainTextErrors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = PlainTextErrorsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(PlainTextErrorsService { service }))
    }
}

pub struct PlainTextErrorsService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for PlainTextErrorsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;

            let message = match res.response().error() {
                // AppError already renders the plain-text shape
                Some(err)
                    if res.status() == StatusCode::BAD_REQUEST
                        && err.as_error::<AppError>().is_none() =>
                {
                    err.to_string()
                }
                _ => return Ok(res.map_into_left_body()),
            };

            tracing::debug!("Rejecting malformed request: {}", message);
            let (req, _) = res.into_parts();
            let response = plain_text_failure(StatusCode::BAD_REQUEST, &message);
            Ok(ServiceResponse::new(req, response).map_into_right_body())
        })
    }
}
