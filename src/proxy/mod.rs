pub mod handler;
pub mod headers;
pub mod playlist;
pub mod target;
pub mod upstream;

pub use handler::relay;
pub use playlist::PlaylistRewriter;
pub use upstream::UpstreamClient;

use actix_web::{guard, web};

/// Registers the liveness probe and the catch-all relay endpoint.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/health")
            // `/health?url=...` is an ordinary relay request
            .guard(guard::fn_guard(|ctx| !carries_relay_target(ctx.head().uri.query())))
            .route(web::get().to(|| async { "OK" })),
    )
    // Other methods on this resource are answered with 405
    .service(web::resource("/{tail:.*}").route(web::get().to(handler::relay)));
}

fn carries_relay_target(query: Option<&str>) -> bool {
    query.is_some_and(|query| {
        query
            .split('&')
            .any(|pair| pair == "url" || pair.starts_with("url="))
    })
}
