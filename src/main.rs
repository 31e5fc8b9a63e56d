use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use reward_ledger::config::AppConfig;
use reward_ledger::error::AppError;
use reward_ledger::rewards::calculator::CalculationError;
use reward_ledger::rewards::{
    rewards_router, InMemoryLedger, ProductType, RewardCalculation, RewardCalculator,
    RewardOutput, RewardService,
};
use reward_ledger::telemetry;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Storefront Rewards Service",
    about = "Run the storefront rewards ledger or inspect reward calculations from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute a customer reward for one sale and print the breakdown
    Calc(CalcArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct CalcArgs {
    /// Product type (affiliate, dropship, physical, consumable, service,
    /// digital, custom, multivendor)
    #[arg(long)]
    product_type: String,
    /// Net margin in cents, for product types that report it directly
    #[arg(long)]
    margin_cents: Option<i64>,
    /// Sale price in cents
    #[arg(long)]
    sale_price_cents: Option<i64>,
    /// Cost of goods in cents
    #[arg(long)]
    cost_cents: Option<i64>,
    /// Payment processing fee in cents
    #[arg(long)]
    payment_fee_cents: Option<i64>,
    /// Shipping subsidy in cents
    #[arg(long)]
    shipping_subsidy_cents: Option<i64>,
    /// Vendor commission in cents
    #[arg(long)]
    commission_cents: Option<i64>,
    /// Promotional multiplier (defaults to 1.0)
    #[arg(long)]
    promo_multiplier: Option<f64>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Calc(args) => run_calc(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let ledger = Arc::new(InMemoryLedger::default());
    let service = Arc::new(RewardService::new(ledger, config.policy.clone()));

    let app: Router = rewards_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rewards service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_calc(args: CalcArgs) -> Result<(), AppError> {
    let product_type = ProductType::from_label(&args.product_type).ok_or_else(|| {
        AppError::from(CalculationError::UnsupportedProductType(
            args.product_type.clone(),
        ))
    })?;

    let config = AppConfig::load()?;

    let calculation = RewardCalculation {
        product_type,
        margin_cents: args.margin_cents,
        sale_price_cents: args.sale_price_cents,
        cost_cents: args.cost_cents,
        payment_fee_cents: args.payment_fee_cents,
        shipping_subsidy_cents: args.shipping_subsidy_cents,
        commission_cents: args.commission_cents,
        promo_multiplier: args.promo_multiplier,
    };

    let calculator = RewardCalculator::new(config.policy);
    let output = calculator.compute(&calculation)?;
    render_reward_output(product_type, &output);
    Ok(())
}

fn render_reward_output(product_type: ProductType, output: &RewardOutput) {
    println!("Reward calculation");
    println!("Product type: {}", product_type.label());
    println!(
        "Net margin: {} ({})",
        output.net_margin_cents,
        format_cents(output.net_margin_cents)
    );
    println!("Tier percent: {}%", output.applied.tier_percent);
    println!("Promo multiplier: {:.2}", output.applied.promo_multiplier);
    println!(
        "Operating buffer: {} ({})",
        output.applied.operating_buffer_cents,
        format_cents(output.applied.operating_buffer_cents)
    );

    let clamp = if output.applied.min_applied {
        "minimum applied"
    } else if output.applied.max_applied {
        "maximum applied"
    } else {
        "none"
    };
    println!("Clamp: {clamp}");

    println!(
        "Customer reward: {} ({})",
        output.customer_reward_cents,
        format_cents(output.customer_reward_cents)
    );
}

/// Display formatting for cents: two decimals, leading currency symbol.
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_render_with_currency_symbol() {
        assert_eq!(format_cents(300), "$3.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(-1250), "-$12.50");
    }

    #[test]
    fn unknown_product_type_is_rejected() {
        let args = CalcArgs {
            product_type: "subscription".to_string(),
            margin_cents: Some(1_000),
            sale_price_cents: None,
            cost_cents: None,
            payment_fee_cents: None,
            shipping_subsidy_cents: None,
            commission_cents: None,
            promo_multiplier: None,
        };
        let err = run_calc(args).expect_err("unknown type rejected");
        assert!(err.to_string().contains("subscription"));
    }
}
