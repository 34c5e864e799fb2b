//! flint-replay: drive the matching engine from the command line.
//!
//! Modes:
//! - `flint-replay --replay <file>`: apply a file of protocol lines
//!   synchronously and print per-symbol top-of-book and stats at EOF.
//! - `flint-replay --bench [n]` / `--bench-async [n]`: synthetic random
//!   workload through the sync engine or the async front-end.
//! - `flint-replay` (no args): interactive REPL with ACKs, inspection
//!   commands, and event/trade logs.
//!
//! Exits non-zero only when a replay or log file cannot be used; invalid
//! protocol lines are logged to the error stream and skipped.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use log::{error, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flint_async::AsyncMatchingEngine;
use flint_core::{
    Event, EventType, InternalEvent, MatchingEngine, OrderId, Side, TimeInForce, TopOfBook, Trade,
    UserId,
};
use flint_metrics::{BenchClock, LatencyHistogram};
use flint_proto::{parse_command, parse_line, Command};

const DEFAULT_BENCH_EVENTS: usize = 1_000_000;
const MAX_ABS_POSITION: i64 = 1_000_000_000;
const BENCH_SEED: u64 = 12345;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--replay") => {
            let path = args
                .get(1)
                .context("usage: flint-replay --replay <file>")?;
            run_replay(path)
        }
        Some("--bench") => {
            run_bench(bench_events(&args));
            Ok(())
        }
        Some("--bench-async") => {
            run_bench_async(bench_events(&args));
            Ok(())
        }
        Some(other) => bail!("unknown mode: {other}"),
        None => run_repl(),
    }
}

fn bench_events(args: &[String]) -> usize {
    args.get(1)
        .and_then(|n| n.parse().ok())
        .unwrap_or(DEFAULT_BENCH_EVENTS)
}

fn format_price(price: Option<i64>) -> String {
    price.map_or_else(|| "none".to_owned(), |p| p.to_string())
}

fn format_top(symbol: &str, tob: &TopOfBook) -> String {
    let mut out = format!(
        "{symbol} bid={} x {}   ask={} x {}",
        format_price(tob.best_bid),
        tob.bid_size.unwrap_or(0),
        format_price(tob.best_ask),
        tob.ask_size.unwrap_or(0),
    );
    if let Some(mid) = tob.mid_price {
        out.push_str(&format!("   mid={mid}"));
    }
    out
}

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "B",
        Side::Sell => "S",
    }
}

fn tif_str(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Gfd => "GFD",
        TimeInForce::Ioc => "IOC",
        TimeInForce::Fok => "FOK",
    }
}

/// Apply a file of protocol lines in order, then print the per-symbol
/// summary.
fn run_replay(path: &str) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("cannot open replay file: {path}"))?;
    let reader = BufReader::new(file);

    let mut engine = MatchingEngine::new(|_t: &Trade| {});
    let mut symbols: Vec<String> = Vec::new();

    for line in reader.lines() {
        let line = line.with_context(|| format!("error reading {path}"))?;
        match parse_line(&line) {
            Ok(Some(event)) => {
                if !symbols.contains(&event.symbol) {
                    symbols.push(event.symbol.clone());
                }
                engine.process(&event);
            }
            Ok(None) => {}
            Err(err) => warn!("skipping invalid line: {err}"),
        }
    }

    println!("--- replay summary for {path} ---");
    for symbol in &symbols {
        println!("{}", format_top(symbol, &engine.top_of_book(symbol)));
        if let Some(stats) = engine.book_stats(symbol) {
            print!("  trades={} volume={}", stats.trade_count, stats.traded_qty);
            if stats.has_last_trade {
                print!(" last_px={}", stats.last_trade_price);
            }
            println!();
        }
    }
    Ok(())
}

/// Interactive synchronous session: ACK every event, echo top-of-book,
/// answer D/U inspection commands, append raw events and trades to logs.
fn run_repl() -> anyhow::Result<()> {
    println!("--- interactive mode (q to quit) ---");
    println!("formats:");
    println!("  L,symbol,B|S,price,qty,GFD|IOC|FOK");
    println!("  M,symbol,B|S,qty");
    println!("  C,symbol,orderId");
    println!("  R,symbol,oldId,B|S,price,qty,GFD|IOC|FOK");
    println!("  D,symbol[,depth]   U,user,symbol");
    println!();

    let mut event_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open("events.log")
        .context("cannot open events.log for writing")?;
    let mut trade_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open("trades.log")
        .context("cannot open trades.log for writing")?;

    let mut engine = MatchingEngine::with_position_limit(
        move |t: &Trade| {
            println!(
                "TRADE {} px={} qty={} buy={} sell={}",
                t.symbol, t.price, t.qty, t.buy_id.0, t.sell_id.0
            );
            let logged = writeln!(
                trade_log,
                "T,{},{},{},{},{}",
                t.symbol, t.price, t.qty, t.buy_id.0, t.sell_id.0
            )
            .and_then(|_| trade_log.flush());
            if let Err(err) = logged {
                error!("trade log write failed: {err}");
            }
        },
        MAX_ABS_POSITION,
    );

    for line in io::stdin().lock().lines() {
        let line = line.context("error reading stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let logged = writeln!(event_log, "{trimmed}").and_then(|_| event_log.flush());
        if let Err(err) = logged {
            error!("event log write failed: {err}");
        }

        let command = match parse_command(trimmed) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                error!("{err}");
                continue;
            }
        };

        match command {
            Command::Quit => {
                println!("stopping order input");
                break;
            }
            Command::Depth { symbol, depth } => match engine.find_book(&symbol) {
                Some(book) => print!("{}", book.depth(depth)),
                None => println!("no book for symbol: {symbol}"),
            },
            Command::Positions { user, symbol } => match engine.user_position(user, &symbol) {
                Some(pos) => println!(
                    "user {} {} position={} traded_volume={}",
                    user.0, symbol, pos.position, pos.traded_volume
                ),
                None => println!("user {} has no position in {symbol}", user.0),
            },
            Command::Event(event) => {
                apply_with_ack(&mut engine, &event);
                println!("{}", format_top(&event.symbol, &engine.top_of_book(&event.symbol)));
            }
        }
    }
    Ok(())
}

fn apply_with_ack(engine: &mut MatchingEngine, event: &Event) {
    match event.kind {
        EventType::NewLimit => {
            let id = engine.new_limit(
                &event.symbol,
                event.user_id,
                event.side,
                event.price,
                event.qty,
                event.tif,
            );
            if id.is_none() {
                println!("REJECT L symbol={} (position cap)", event.symbol);
            } else {
                println!(
                    "ACK L id={} symbol={} side={} px={} qty={} tif={}",
                    id.0,
                    event.symbol,
                    side_str(event.side),
                    event.price,
                    event.qty,
                    tif_str(event.tif)
                );
            }
        }
        EventType::NewMarket => {
            let id = engine.new_market(&event.symbol, event.user_id, event.side, event.qty);
            if id.is_none() {
                println!("REJECT M symbol={} (position cap)", event.symbol);
            } else {
                println!(
                    "ACK M id={} symbol={} side={} qty={}",
                    id.0,
                    event.symbol,
                    side_str(event.side),
                    event.qty
                );
            }
        }
        EventType::Cancel => {
            let ok = engine.cancel(&event.symbol, event.id);
            println!(
                "{} C id={} symbol={}",
                if ok { "ACK" } else { "REJECT" },
                event.id.0,
                event.symbol
            );
        }
        EventType::Replace => {
            let new_id = engine.replace(
                &event.symbol,
                event.id,
                event.side,
                event.price,
                event.qty,
                event.tif,
            );
            println!(
                "ACK R old_id={} new_id={} symbol={}",
                event.id.0, new_id.0, event.symbol
            );
        }
        EventType::Stop => {}
    }
}

/// Seeded random workload through the synchronous engine, with per-event
/// latency percentiles.
fn run_bench(events: usize) {
    let trade_count = Arc::new(AtomicU64::new(0));
    let traded_qty = Arc::new(AtomicU64::new(0));
    let (count, qty) = (Arc::clone(&trade_count), Arc::clone(&traded_qty));
    let mut engine = MatchingEngine::new(move |t: &Trade| {
        count.fetch_add(1, Ordering::Relaxed);
        qty.fetch_add(t.qty as u64, Ordering::Relaxed);
    });
    let symbol = engine.resolve_symbol("FOO");

    let mut rng = StdRng::seed_from_u64(BENCH_SEED);
    let clock = BenchClock::new();
    let mut latency = LatencyHistogram::new();
    let mut live: Vec<OrderId> = Vec::new();

    let start = Instant::now();
    for _ in 0..events {
        if !live.is_empty() && rng.gen_range(0..10) == 0 {
            let idx = rng.gen_range(0..live.len());
            let id = live.swap_remove(idx);
            let t0 = clock.now();
            engine.cancel_id(symbol, id);
            latency.record(clock.delta_nanos(t0, clock.now()));
        } else {
            let side = if rng.gen_range(0..2) == 0 { Side::Buy } else { Side::Sell };
            let price = rng.gen_range(95..=105);
            let qty = rng.gen_range(1..=100);
            let t0 = clock.now();
            let id = engine.new_limit_id(symbol, UserId::default(), side, price, qty, TimeInForce::Gfd);
            latency.record(clock.delta_nanos(t0, clock.now()));
            live.push(id);
        }
    }
    let elapsed = start.elapsed();

    println!("--- sync benchmark ---");
    println!(
        "processed {events} events in {:.3}s (~{:.2}M events/s)",
        elapsed.as_secs_f64(),
        events as f64 / elapsed.as_secs_f64() / 1e6
    );
    println!("latency: {}", latency.summary());
    println!("{}", format_top("FOO", &engine.top_of_book("FOO")));
    println!(
        "trades executed: {}, total traded qty = {}",
        trade_count.load(Ordering::Relaxed),
        traded_qty.load(Ordering::Relaxed)
    );
}

/// The same workload pushed through the async front-end on the
/// zero-allocation submit path, then drained via `stop`.
fn run_bench_async(events: usize) {
    let trade_count = Arc::new(AtomicU64::new(0));
    let traded_qty = Arc::new(AtomicU64::new(0));
    let (count, qty) = (Arc::clone(&trade_count), Arc::clone(&traded_qty));
    let mut async_engine = AsyncMatchingEngine::new(move |t: &Trade| {
        count.fetch_add(1, Ordering::Relaxed);
        qty.fetch_add(t.qty as u64, Ordering::Relaxed);
    });
    let symbol = async_engine.symbols().get_or_create("FOO");

    let mut rng = StdRng::seed_from_u64(BENCH_SEED);
    let start = Instant::now();
    for _ in 0..events {
        let side = if rng.gen_range(0..2) == 0 { Side::Buy } else { Side::Sell };
        let event = InternalEvent {
            symbol,
            id: OrderId::NONE,
            price: rng.gen_range(95..=105),
            qty: rng.gen_range(1..=100),
            user_id: UserId::default(),
            kind: EventType::NewLimit,
            side,
            tif: TimeInForce::Gfd,
        };
        async_engine.submit_internal(event);
    }
    async_engine.stop();
    let elapsed = start.elapsed();

    println!("--- async benchmark ---");
    println!(
        "processed {events} events in {:.3}s (~{:.2}M events/s)",
        elapsed.as_secs_f64(),
        events as f64 / elapsed.as_secs_f64() / 1e6
    );
    if let Some(engine) = async_engine.engine() {
        if let Some(stats) = engine.book_stats("FOO") {
            print!("FOO trades={} volume={}", stats.trade_count, stats.traded_qty);
            if stats.has_last_trade {
                print!(" last_px={}", stats.last_trade_price);
            }
            println!();
        }
    }
    println!(
        "trades executed: {}, total traded qty = {}",
        trade_count.load(Ordering::Relaxed),
        traded_qty.load(Ordering::Relaxed)
    );
}
