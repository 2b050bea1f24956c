// Run and check command implementations
use tracing::{info, warn};
use rust_decimal::Decimal;
use recentering_grid_bot::{
    Balances, Config, ControlLoop, GridEngine, KrakenPublicClient, OrderReconciler, PaperExchange,
    RetryPolicy, RetryingMarket, TradingError, TradingResult,
};

pub fn check_config(config: &Config, center: Option<Decimal>) -> TradingResult<()> {
    config.validate()?;
    let trading = &config.trading;

    info!("✅ Configuration is valid");
    info!("📊 Pair: {}", trading.pair);
    info!("📏 Grid spacing: {}", trading.grid_spacing);
    info!("📦 Min order size: {}", trading.min_order_size);
    info!(
        "🔄 Recenter: drift > {}, trend shift > {}, idle > {}s",
        config.policy.effective_price_shift_threshold(trading.grid_spacing),
        config.policy.trend_shift_threshold,
        config.policy.idle_timeout_secs
    );
    info!(
        "📈 Trend: SMA{} vs SMA{} on {} candles",
        config.market.short_window, config.market.long_window, config.market.candle_timeframe
    );

    let Some(center) = center.or(trading.initial_center) else {
        info!("💡 Pass --center to preview rung prices");
        return Ok(());
    };

    if center <= Decimal::ZERO {
        return Err(TradingError::ConfigValidation("center must be positive".to_string()));
    }

    let reconciler = OrderReconciler::from_config(trading);
    let rungs = reconciler.rung_prices(center);
    info!("🎯 Center {}: buy rung {}, sell rung {}", center, rungs.buy, rungs.sell);
    if rungs.buy <= Decimal::ZERO {
        warn!("⚠️  Buy rung is not positive; only the sell side would be placed");
    } else {
        info!(
            "💰 Quote needed for a minimum buy: {:.8}",
            reconciler.quote_required(rungs.buy)
        );
    }
    info!("💰 Base needed for a minimum sell: {}", trading.min_order_size);
    Ok(())
}

pub async fn run_paper(mut config: Config, cycles: Option<usize>, center: Option<Decimal>) -> TradingResult<()> {
    if center.is_some() {
        config.trading.initial_center = center;
    }
    config.validate()?;

    info!("🧪 PAPER mode: live prices from {}, simulated fills", config.exchange.rest_url);
    let feed = KrakenPublicClient::new(config.exchange.rest_url.clone())
        .with_pair_override(config.exchange.exchange_pair.clone());
    info!("🔗 Exchange pair: {}", feed.kraken_pair(&config.trading.pair));

    let paper = PaperExchange::new(
        feed,
        Balances {
            quote: config.exchange.paper_quote_balance,
            base: config.exchange.paper_base_balance,
        },
        config.trading.trading_fee,
    );
    let market = RetryingMarket::new(paper, RetryPolicy::from_config(&config.exchange));
    let engine = GridEngine::new(market, config);

    let summary = ControlLoop::new(engine).with_max_cycles(cycles).run().await;

    info!("");
    info!("📋 Session summary");
    info!("   Cycles: {} ({} failed)", summary.cycles, summary.failed_cycles);
    info!(
        "   Final center: {}",
        summary.final_state.center_price.map_or("-".to_string(), |c| c.to_string())
    );
    info!(
        "   Profit: {:.2} over {} sells",
        summary.profit.total_profit, summary.profit.sell_count
    );
    info!(
        "   Shutdown: {} canceled, {} failed",
        summary.shutdown.canceled, summary.shutdown.failed
    );
    Ok(())
}
