use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tradevolve::config::AppConfig;
use tradevolve::data::{load_quotes, OrderCache};
use tradevolve::expr::Expression;
use tradevolve::gp::{run, ConsoleProgressCallback, GeneticProgramme, GpParameters};

#[derive(Serialize)]
struct EvolvedRule {
    portfolio_value: f64,
    buy_rule: String,
    sell_rule: String,
    buy_tree: Expression,
    sell_tree: Expression,
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let quotes_path = match args.next() {
        Some(path) => path,
        None => bail!("usage: tradevolve <quotes.csv> [config.toml]"),
    };
    let config = match args.next() {
        Some(path) => AppConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => AppConfig::default(),
    };

    let quotes = Arc::new(load_quotes(&quotes_path).context("loading quote data")?);
    let mut symbols: Vec<String> = quotes.symbols().map(str::to_string).collect();
    symbols.sort();
    let orders = OrderCache::from_ordered_symbols(symbols);

    // Leave some history before the trading window so lagging rules have
    // room to look back.
    let warmup = 30.min(quotes.days().saturating_sub(1));
    let start_date = quotes
        .date_of(warmup)
        .context("quote bundle has no trading days")?;
    let end_date = quotes.last_date().context("quote bundle has no trading days")?;

    let params = GpParameters {
        breeding_population_size: config.gp.breeding_population_size,
        min_rule_size: config.gp.min_rule_size,
        max_rule_size: config.gp.max_rule_size,
        start_date,
        end_date,
        initial_capital: config.trading.initial_capital,
        sizing: config.trading.sizing,
        trade_cost: config.trading.trade_cost,
        seed: config.gp.seed,
    };

    let mut gp = GeneticProgramme::new(Arc::clone(&quotes), orders, params);
    let cancel = AtomicBool::new(false);
    let mut callback = ConsoleProgressCallback;

    let elites = run(
        &mut gp,
        config.gp.generations,
        config.gp.proposals_per_generation,
        &cancel,
        &mut callback,
    );

    if elites.is_empty() {
        bail!("no candidate survived evaluation; try a longer quote history");
    }

    println!("\nEvolved {} rule pairs:", elites.len());
    let mut report = Vec::new();
    for (rank, individual) in elites.iter().enumerate() {
        let value = individual.value().unwrap_or(0.0);
        println!("  #{} portfolio value {:.2}", rank + 1, value);
        println!("     buy:  {}", individual.buy_rule());
        println!("     sell: {}", individual.sell_rule());
        report.push(EvolvedRule {
            portfolio_value: value,
            buy_rule: individual.buy_rule().to_string(),
            sell_rule: individual.sell_rule().to_string(),
            buy_tree: individual.buy_rule().clone(),
            sell_tree: individual.sell_rule().clone(),
        });
    }

    let out = std::fs::File::create("evolved_rules.json").context("writing evolved_rules.json")?;
    serde_json::to_writer_pretty(out, &report).context("serialising evolved rules")?;
    println!("\nWrote evolved_rules.json");

    Ok(())
}
