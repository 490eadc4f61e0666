use crate::cli::ServeArgs;
use crate::demo::{elevator_mandatory_categories, elevator_product};
use crate::infra::{load_product, AppState, InMemoryProductSource};
use crate::routes::with_evaluation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use configurator::config::AppConfig;
use configurator::error::AppError;
use configurator::telemetry;
use configurator::{ConfigurationService, EngineConfig, ProductDefinition};
use std::path::PathBuf;
use tracing::info;

const MANDATORY_CATEGORIES_VAR: &str = "APP_MANDATORY_CATEGORIES";

/// Products to serve: the given catalog, or the built-in elevator. The elevator's mandatory
/// categories apply only when none were configured explicitly.
fn served_products(
    catalog: Option<PathBuf>,
    engine: &mut EngineConfig,
    categories_configured: bool,
) -> Result<Vec<ProductDefinition>, AppError> {
    match catalog {
        Some(path) => Ok(vec![load_product(&path)?]),
        None => {
            if !categories_configured {
                engine.mandatory_categories = elevator_mandatory_categories();
            }
            Ok(vec![elevator_product()])
        }
    }
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let categories_configured = std::env::var_os(MANDATORY_CATEGORIES_VAR).is_some();
    let products = served_products(
        args.catalog.take(),
        &mut config.engine,
        categories_configured,
    )?;
    let source = InMemoryProductSource::from_products(products);
    info!(products = ?source.product_ids(), "product catalog loaded");

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(ConfigurationService::new(
        Arc::new(source),
        config.engine.clone(),
    ));
    let strategy = service.engine().strategy_name();

    let app = with_evaluation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, strategy, "configuration evaluator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
