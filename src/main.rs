// src/main.rs

use chrono::{Duration, NaiveDate};
use tracing::{error, info};

use stock_options::io::demand::generate_seeded_demand;
use stock_options::io::reporting::{allocation_rows, frontier_rows, schedule_rows, write_csv};
use stock_options::portfolio::{CorrelationRule, LogisticsEvent, PortfolioOptimizer};
use stock_options::pricing::{evaluate_item, VolatilitySynthesizer};
use stock_options::risk::RiskEstimator;
use stock_options::{
    telemetry, AllocatorSettings, DemandScenario, EngineResult, Item, MarketTables, PortfolioConstraints,
    SalesRecord, SeasonalityProfile, SimulationMethod, ValuationParameters, VolumeDiscountTier,
};

fn sample_items() -> Vec<Item> {
    let mut summer = [1.0; 12];
    summer[5] = 1.6;
    summer[6] = 1.8;
    summer[7] = 1.4;

    vec![
        Item::new(1, "PH-100", 25.0, 8.0, 180.0, 60.0)
            .with_name("Phone 100")
            .with_currency("USD")
            .with_supplier("china")
            .with_volume(0.5)
            .with_discount_tiers(vec![VolumeDiscountTier::new(200, 5.0), VolumeDiscountTier::new(500, 8.0)]),
        Item::new(2, "CASE-100", 60.0, 20.0, 90.0, 160.0)
            .with_name("Phone 100 case")
            .with_supplier("domestic")
            .with_volume(0.1)
            .with_order_bounds(Some(50), Some(2_000)),
        Item::new(3, "FAN-20", 30.0, 15.0, 35.0, 12.0)
            .with_name("Summer desk fan")
            .with_currency("CNY")
            .with_supplier("china")
            .with_volume(2.0)
            .with_seasonality(SeasonalityProfile {
                monthly_factors: summer,
                current_month: 5,
            }),
        Item::new(4, "MUG-7", 45.0, 12.0, 4.0, 3.5)
            .with_name("Ceramic mug")
            .with_currency("EUR")
            .with_supplier("europe")
            .with_volume(0.3)
            .with_current_stock(120),
    ]
}

fn synthetic_history(item: &Item, as_of: NaiveDate, weeks: usize, seed: u64) -> EngineResult<Vec<SalesRecord>> {
    let units = generate_seeded_demand(weeks, item.weekly_demand_mean, item.weekly_demand_std, seed)?;
    Ok(units
        .into_iter()
        .enumerate()
        .map(|(i, u)| SalesRecord::new(as_of - Duration::days(((weeks - 1 - i) * 7) as i64), u, None))
        .collect())
}

fn run() -> EngineResult<()> {
    // 1. SETUP CONFIGURATION
    let as_of = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap_or_default();
    let params = ValuationParameters {
        lead_time_weeks: 8.0,
        simulation_method: SimulationMethod::Auto,
        random_seed: Some(42),
        ..ValuationParameters::default()
    };
    let constraints = PortfolioConstraints {
        total_budget: 2_500_000.0,
        warehouse_capacity: 3_000.0,
        max_sku_share: 0.4,
        min_distinct_skus: 3,
        ..PortfolioConstraints::default()
    };
    let settings = AllocatorSettings {
        active_season: Some("summer".into()),
        ..AllocatorSettings::default()
    };
    let tables = MarketTables::default();
    let items = sample_items();

    // 2. SINGLE-ITEM VALUATION
    let synth = VolatilitySynthesizer::new(tables.clone());
    for item in &items {
        let v = evaluate_item(item, &params, &synth)?;
        println!(
            "{:<10} best q = {:>5}  value = {:>12.2}  safety = {:>4}  ROP = {:>5}  ({:?})",
            item.sku,
            v.optimization.best_quantity,
            v.optimization.best_option_value,
            v.safety_stock,
            v.reorder_point,
            v.method
        );
    }

    // 3. PORTFOLIO ALLOCATION
    let scenarios = vec![
        DemandScenario::new("slump", 0.2, 0.7, 1.3),
        DemandScenario::new("base", 0.6, 1.0, 1.0),
        DemandScenario::new("boom", 0.2, 1.3, 0.9),
    ];
    let mut rules = stock_options::portfolio::default_rules();
    rules.push(CorrelationRule::seasonal(&["fan"], 1.5, "summer"));
    let events = vec![LogisticsEvent {
        country: Some("china".into()),
        start: as_of + Duration::days(30),
        end: as_of + Duration::days(40),
        delay_days: 10,
    }];

    let mut optimizer = PortfolioOptimizer::new(items.clone(), constraints, params.clone(), tables.clone())?
        .with_scenarios(scenarios.clone())?
        .with_settings(settings)
        .with_rules(rules)
        .with_logistics_events(events)
        .as_of(as_of);
    let mut histories = Vec::new();
    for item in &items {
        let history = synthetic_history(item, as_of, 26, 100 + item.id)?;
        optimizer = optimizer.with_sales_history(item.id, history.clone())?;
        histories.push((item.id, history));
    }

    let allocation = optimizer.optimize()?;
    let frontier = optimizer.frontier_from(&allocation, 5)?;
    let schedule = optimizer.create_delivery_schedule(&allocation)?;

    // 4. RISK
    let mut estimator = RiskEstimator::new(&items, &tables, as_of);
    for (id, history) in &histories {
        estimator = estimator.with_history(*id, history);
    }
    let historical = estimator.estimate(0.95)?;
    let mixture = estimator.clone().with_scenarios(&scenarios)?.estimate(0.95)?;

    // 5. EXPORT RESULTS
    write_csv("allocation.csv", &allocation_rows(&optimizer, &allocation)?)?;
    write_csv("frontier.csv", &frontier_rows(&frontier))?;
    write_csv("delivery_schedule.csv", &schedule_rows(&schedule))?;

    // 6. SUMMARY
    println!("\n=== Portfolio ===");
    for (id, qty) in &allocation.allocations {
        println!("item {id}: {qty} units");
    }
    println!("Investment:      {:.2}", allocation.total_investment);
    println!("Expected return: {:.2}", allocation.expected_return);
    println!("Risk (CV):       {:.4}", allocation.portfolio_risk);
    if allocation.diversification_shortfall > 0 {
        println!("Missing {} distinct items", allocation.diversification_shortfall);
    }
    for week in &schedule {
        println!("week of {}: {:.2}", week.week_start, week.total_value());
    }

    println!("\n=== Weekly revenue risk (95%) ===");
    for report in [historical, mixture] {
        println!(
            "{:?}: VaR {:.2}  ES {:.2}  (mean {:.2}, std {:.2})",
            report.source, report.var, report.es, report.mean, report.std
        );
    }
    Ok(())
}

fn main() {
    telemetry::init();
    info!("stock option engine demo");

    if let Err(e) = run() {
        error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}
