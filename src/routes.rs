use crate::{
    api::{attendance, payroll, performance, requests},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter for the protected scope; built once and shared by all workers.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Arc<Limiter>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: Arc<Limiter>) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .service(
                web::scope("/requests")
                    // /requests
                    .service(
                        web::resource("")
                            .route(web::post().to(requests::submit_request))
                            .route(web::get().to(requests::list_requests)),
                    )
                    // /requests/{id}
                    .service(web::resource("/{id}").route(web::get().to(requests::get_request)))
                    // /requests/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(requests::approve_request)),
                    )
                    // /requests/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(requests::reject_request)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/import").route(web::post().to(attendance::import_sheet)),
                    )
                    .service(web::resource("/summary").route(web::get().to(attendance::summary)))
                    .service(web::resource("/my").route(web::get().to(attendance::my_attendance)))
                    // /attendance/{employee_id}/{date}/status
                    .service(
                        web::resource("/{employee_id}/{date}/status")
                            .route(web::put().to(attendance::set_status)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    // /payroll
                    .service(web::resource("").route(web::post().to(payroll::issue_payslip)))
                    .service(web::resource("/compute").route(web::post().to(payroll::compute)))
                    .service(web::resource("/run").route(web::post().to(payroll::run)))
                    // /payroll/{employee_id}/{year}/{month}
                    .service(
                        web::resource("/{employee_id}/{year}/{month}")
                            .route(web::get().to(payroll::get_payslip)),
                    ),
            )
            .service(
                web::scope("/performance").service(
                    web::resource("/efficiency").route(web::post().to(performance::efficiency)),
                ),
            ),
    );
}
