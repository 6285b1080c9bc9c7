use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use twapbot::config::Settings;
use twapbot::exchange::PaperExchange;
use twapbot::report::{self, Notifier, StdoutNotifier};
use twapbot::scheduler::{EventSink, ExecutionPlan, Phase, TwapScheduler};
use twapbot::Side;

/// Time-sliced limit-order execution against a paper exchange.
#[derive(Parser, Debug)]
#[command(name = "twapbot", version)]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "twap.toml")]
    config: String,

    /// Starting mid price for the paper exchange.
    #[arg(long, default_value_t = 100.0)]
    mid_price: f64,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Seed the paper exchange so the configured plan is affordable.
fn seed_exchange(exchange: &PaperExchange, plan: &ExecutionPlan, mid_price: f64) {
    match plan.side {
        Side::Buy => {
            // Quote budget with headroom for spread and slippage.
            exchange.deposit(&plan.market.quote, plan.target_amount * mid_price * 1.1);
        }
        Side::Sell => {
            exchange.deposit(&plan.market.base, plan.target_amount);
        }
    }
}

async fn run(plan: ExecutionPlan, mid_price: f64) -> anyhow::Result<()> {
    let exchange = Arc::new(
        PaperExchange::new(mid_price)
            .with_drift(0.0005)
            .with_fill_window(0.0005)
            .with_partial_fills(0.25),
    );
    seed_exchange(&exchange, &plan, mid_price);

    let mut scheduler = TwapScheduler::new(plan, exchange.clone());
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(1));
    let started = Utc::now();

    loop {
        ticker.tick().await;

        // Event path first, then the clock path; the single loop is what
        // serializes callbacks relative to ticks.
        for event in exchange.step() {
            tracing::debug!(order_id = %event.order_id(), "dispatching order event");
            scheduler.on_event(&event);
        }
        let elapsed = (Utc::now() - started).num_milliseconds() as f64 / 1000.0;
        scheduler.tick(elapsed)?;

        if scheduler.phase() == Phase::Terminal {
            break;
        }
    }

    println!("{}", report::format_status(&scheduler.status()));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();
    let args = Args::parse();
    let notifier = StdoutNotifier;

    tracing::info!(config = %args.config, "twapbot starting");

    let plan = match Settings::load(&args.config).and_then(Settings::into_plan) {
        Ok(plan) => plan,
        Err(err) => {
            // Configuration errors are the one fatal class: reject the
            // plan, tell the operator, and do not start.
            notifier.notify(&format!("twapbot did not start: {err}"));
            tracing::error!(error = %err, "invalid configuration, refusing to start");
            return Err(err.into());
        }
    };

    tracing::info!(
        market = %plan.market,
        side = %plan.side,
        amount = plan.target_amount,
        duration_secs = plan.total_duration,
        bins = plan.bin_count,
        "execution plan accepted, first order expected within {:.0}s",
        plan.time_per_bin()
    );

    run(plan, args.mid_price).await
}
