//! Criterion benchmarks for rslab hot paths.
//!
//! Benchmarks:
//! 1. Indicator engine over a multi-ticker panel
//! 2. Snapshot flatten + weighted scoring
//! 3. Ranking a large scored frame

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rslab_core::dates::{generate_theoretical_dates, resolve_to_trading_dates};
use rslab_core::indicators::{IndicatorEngine, IndicatorParams};
use rslab_core::ranking::{build_ranking, RankingOptions};
use rslab_core::scoring::{calculate_relative_strength, SCORE_COLUMN};
use rslab_core::snapshot::{extract_price_snapshots, flatten_snapshot_for_scoring};
use rslab_core::{Field, Panel, TickerFrame};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_panel(tickers: usize, days: usize) -> Panel {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let dates = (0..days)
        .map(|i| base_date + chrono::Duration::days(i as i64))
        .collect();
    let mut columns = Vec::with_capacity(tickers * 4);
    for t in 0..tickers {
        let ticker = format!("T{t:04}");
        let close: Vec<f64> = (0..days)
            .map(|i| 100.0 + ((i + t) as f64 * 0.1).sin() * 10.0)
            .collect();
        columns.push((Field::High, ticker.clone(), close.iter().map(|c| c + 1.5).collect()));
        columns.push((Field::Low, ticker.clone(), close.iter().map(|c| c - 1.5).collect()));
        columns.push((Field::AdjClose, ticker.clone(), close.clone()));
        columns.push((Field::Close, ticker, close));
    }
    Panel::from_columns(dates, columns).unwrap()
}

// ── 1. Indicator engine ──────────────────────────────────────────────

fn bench_indicator_engine(c: &mut Criterion) {
    let engine = IndicatorEngine::from_params(&IndicatorParams::default()).unwrap();
    let mut group = c.benchmark_group("indicator_engine");
    for tickers in [10, 100] {
        let panel = make_panel(tickers, 500);
        group.bench_with_input(BenchmarkId::from_parameter(tickers), &panel, |b, panel| {
            b.iter(|| engine.apply(black_box(panel)).unwrap())
        });
    }
    group.finish();
}

// ── 2. Snapshot + scoring ────────────────────────────────────────────

fn bench_scoring(c: &mut Criterion) {
    let panel = make_panel(400, 500);
    let reference = *panel.dates().last().unwrap();
    let theoretical = generate_theoretical_dates(reference, 7, 30);
    let resolved = resolve_to_trading_dates(panel.dates(), &theoretical).unwrap();

    c.bench_function("snapshot_and_score_400", |b| {
        b.iter(|| {
            let snap =
                extract_price_snapshots(black_box(&panel), &resolved, Field::AdjClose).unwrap();
            let flat = flatten_snapshot_for_scoring(&snap, Field::AdjClose).unwrap();
            calculate_relative_strength(&flat).unwrap()
        })
    });
}

// ── 3. Ranking ───────────────────────────────────────────────────────

fn bench_ranking(c: &mut Criterion) {
    let n = 2_000;
    let mut frame = TickerFrame::new((0..n).map(|i| format!("T{i:05}")).collect()).unwrap();
    frame
        .add_numeric(
            SCORE_COLUMN,
            (0..n).map(|i| ((i * 7919) % 1000) as f64 / 1000.0).collect(),
        )
        .unwrap();
    let options = RankingOptions {
        min_score: 80.0,
        ..Default::default()
    };
    c.bench_function("build_ranking_2000", |b| {
        b.iter(|| build_ranking(black_box(&frame), &options).unwrap())
    });
}

criterion_group!(benches, bench_indicator_engine, bench_scoring, bench_ranking);
criterion_main!(benches);
