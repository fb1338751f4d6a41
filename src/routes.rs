use crate::{api::payroll, auth::middleware::auth_middleware, config::Config};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter allowing `requests_per_min` with a full-minute burst.
/// `None` only if the builder rejects the quota.
pub fn build_limiter(requests_per_min: u32) -> Option<LimiterConfig> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: &LimiterConfig) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(limiter)) // rate limiting
            .service(
                web::scope("/payroll")
                    // /payroll/batches
                    .service(
                        web::resource("/batches")
                            .route(web::post().to(payroll::generate_payroll))
                            .route(web::get().to(payroll::list_batches)),
                    )
                    // /payroll/batches/{id}
                    .service(
                        web::resource("/batches/{id}").route(web::get().to(payroll::get_batch)),
                    )
                    .service(
                        web::resource("/batches/{id}/accept")
                            .route(web::put().to(payroll::accept_batch)),
                    )
                    .service(
                        web::resource("/batches/{id}/reject")
                            .route(web::put().to(payroll::reject_batch)),
                    )
                    // must precede /items/{id}
                    .service(
                        web::resource("/items/transition")
                            .route(web::put().to(payroll::transition_items)),
                    )
                    // /payroll/items/{id}
                    .service(
                        web::resource("/items/{id}")
                            .route(web::get().to(payroll::get_item))
                            .route(web::put().to(payroll::edit_item)),
                    )
                    .service(
                        web::resource("/items/{id}/history")
                            .route(web::get().to(payroll::item_history)),
                    )
                    .service(
                        web::resource("/items/{id}/recompute-hours")
                            .route(web::post().to(payroll::recompute_hours)),
                    )
                    .service(
                        web::resource("/items/{id}/release")
                            .route(web::put().to(payroll::release_payment)),
                    )
                    .service(
                        web::resource("/items/{id}/reject-release")
                            .route(web::put().to(payroll::reject_at_release)),
                    ),
            ),
    );
}
