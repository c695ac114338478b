use crate::{
    api::{analytics, attendance, payroll},
    auth::middleware::auth_middleware,
    config::Config,
    services::{
        analytics::AnalyticsFacade, anomaly::AnomalyEngine, forecast::ForecastEngine,
        payroll_calculator::PayrollCalculator,
    },
    store::PayrollStore,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

pub type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Everything the HTTP workers share. Built once; the limiter state is shared
/// across workers through the cloned config.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn PayrollStore>,
    pub limiter: LimiterConfig,
}

// Helper to build the per-IP limiter
fn build_limiter(requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn PayrollStore>) -> anyhow::Result<Self> {
        let limiter = build_limiter(config.rate_protected_per_min)?;
        Ok(Self {
            config,
            store,
            limiter,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, state: AppState) {
    let AppState {
        config,
        store,
        limiter,
    } = state;

    let calculator = PayrollCalculator::new(store.clone(), config.payroll.clone());
    let facade = AnalyticsFacade::new(
        store.clone(),
        ForecastEngine::new(config.forecast.clone()),
        AnomalyEngine::new(config.anomaly.clone()),
        Duration::from_millis(config.analytics_timeout_ms),
    );

    cfg.app_data(web::Data::new(config.clone()))
        .app_data(web::Data::from(store))
        .app_data(web::Data::new(calculator))
        .app_data(web::Data::new(facade));

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limiter)) // rate limiting
            .service(
                web::scope("/payroll")
                    // /payroll
                    .service(web::resource("").route(web::get().to(payroll::list_payroll)))
                    // /payroll/process
                    .service(
                        web::resource("/process").route(web::post().to(payroll::process_payroll)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("").route(web::post().to(attendance::record_attendance)),
                    )
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(attendance::attendance_summary)),
                    ),
            )
            .service(
                web::scope("/analytics")
                    .service(web::resource("/dashboard").route(web::get().to(analytics::dashboard)))
                    .service(web::resource("/forecast").route(web::get().to(analytics::forecast)))
                    .service(
                        web::resource("/anomalies").route(web::get().to(analytics::anomalies)),
                    ),
            ),
    );
}
