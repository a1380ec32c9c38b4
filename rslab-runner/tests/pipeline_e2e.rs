//! End-to-end pipeline runs over hand-built and synthetic panels.

use chrono::{Datelike, Duration, NaiveDate};
use rslab_core::{CoreError, Field, Panel};
use rslab_runner::{
    run_pipeline, NoEnrichment, Pipeline, PipelineConfig, PipelineError, PipelineStatus,
    StaticEnrichment, SyntheticPanelProvider,
};

fn weekdays(start: NaiveDate, days: i64) -> Vec<NaiveDate> {
    (0..days)
        .map(|i| start + Duration::days(i))
        .filter(|d| d.weekday().number_from_monday() <= 5)
        .collect()
}

/// Weekday panel with A rising, B flat and C falling, plus any extra
/// tickers given as full adj-close series.
fn panel_with(extra: &[(&str, f64)]) -> Panel {
    panel_over(240, extra)
}

fn panel_over(days: i64, extra: &[(&str, f64)]) -> Panel {
    let dates = weekdays(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), days);
    let n = dates.len();
    let mut series: Vec<(String, Vec<f64>)> = vec![
        ("A".into(), (0..n).map(|i| 50.0 + i as f64 * 0.5).collect()),
        ("B".into(), vec![80.0; n]),
        ("C".into(), (0..n).map(|i| 150.0 - i as f64 * 0.4).collect()),
    ];
    for (ticker, value) in extra {
        series.push((ticker.to_string(), vec![*value; n]));
    }

    let mut columns = Vec::new();
    for (ticker, close) in series {
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        columns.push((Field::High, ticker.clone(), high));
        columns.push((Field::Low, ticker.clone(), low));
        columns.push((Field::Close, ticker.clone(), close.clone()));
        columns.push((Field::AdjClose, ticker, close));
    }
    Panel::from_columns(dates, columns).unwrap()
}

fn reference(panel: &Panel) -> NaiveDate {
    *panel.dates().last().unwrap()
}

// ── 1. Ranking order and filters ──

#[test]
fn default_config_keeps_only_the_strongest_uptrend() {
    let panel = panel_with(&[]);
    let out = run_pipeline(&panel, reference(&panel), &PipelineConfig::default(), &NoEnrichment)
        .unwrap();

    assert_eq!(out.summary.status, PipelineStatus::Ok);
    assert!(out.summary.message.is_none());
    assert_eq!(out.summary.resolved_dates.len(), 7);
    assert_eq!(out.summary.total_universe, 3);
    assert_eq!(out.summary.scored_assets, 3);
    assert_eq!(out.summary.ranked_assets, 1);
    assert_eq!(out.ranking.len(), 1);
    assert_eq!(out.ranking[0].ticker, "A");
    assert_eq!(out.ranking[0].rank, 100.0);
    assert!(out.ranking[0].score < 0.0);
}

#[test]
fn lower_threshold_keeps_rising_and_flat() {
    let panel = panel_with(&[]);
    let config = PipelineConfig {
        min_fr_rank: 50.0,
        ..Default::default()
    };
    let out = run_pipeline(&panel, reference(&panel), &config, &NoEnrichment).unwrap();
    let tickers: Vec<&str> = out.ranking.iter().map(|e| e.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["A", "B"]);
    assert_eq!(out.ranking[1].rank, 66.67);
    assert_eq!(out.ranking[1].score, 0.0);
}

#[test]
fn top_n_truncates_after_filtering() {
    let panel = panel_with(&[]);
    let config = PipelineConfig {
        min_fr_rank: 0.0,
        top_n: Some(2),
        ..Default::default()
    };
    let out = run_pipeline(&panel, reference(&panel), &config, &NoEnrichment).unwrap();
    assert_eq!(out.ranking.len(), 2);
    assert_eq!(out.summary.ranked_assets, 2);
}

#[test]
fn payload_fields_are_copied_into_entries() {
    let panel = panel_with(&[]);
    let config = PipelineConfig {
        min_fr_rank: 0.0,
        payload_fields: vec!["p0".into(), "p6".into()],
        ..Default::default()
    };
    let out = run_pipeline(&panel, reference(&panel), &config, &NoEnrichment).unwrap();
    let b = out.ranking.iter().find(|e| e.ticker == "B").unwrap();
    assert_eq!(b.extra["p0"].as_f64(), Some(80.0));
    assert_eq!(b.extra["p6"].as_f64(), Some(80.0));
}

// ── 2. Undefined scores and empty outcomes ──

#[test]
fn tickers_without_prices_are_counted_but_not_ranked() {
    let panel = panel_with(&[("D", f64::NAN)]);
    let config = PipelineConfig {
        min_fr_rank: 0.0,
        ..Default::default()
    };
    let out = run_pipeline(&panel, reference(&panel), &config, &NoEnrichment).unwrap();
    assert_eq!(out.summary.total_universe, 4);
    assert_eq!(out.summary.scored_assets, 3);
    assert!(out.ranking.iter().all(|e| e.ticker != "D"));

    // The chart snapshot still carries D, as nulls.
    let json: serde_json::Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
    let snapshot = &json["charts"]["price_snapshots"];
    assert_eq!(snapshot["tickers"][3], "D");
    assert!(snapshot["values"][0][3].is_null());
}

#[test]
fn no_scorable_asset_is_a_message_not_an_error() {
    let dates = weekdays(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 240);
    let n = dates.len();
    let panel = Panel::from_columns(
        dates,
        [Field::High, Field::Low, Field::Close, Field::AdjClose]
            .into_iter()
            .map(|f| (f, "X".to_string(), vec![f64::NAN; n])),
    )
    .unwrap();
    let out = run_pipeline(&panel, reference(&panel), &PipelineConfig::default(), &NoEnrichment)
        .unwrap();
    assert_eq!(out.summary.status, PipelineStatus::NoScoredAssets);
    assert_eq!(out.summary.message.as_deref(), Some("no assets could be scored"));
    assert!(out.ranking.is_empty());
}

#[test]
fn reference_before_history_is_a_no_trading_date_error() {
    let panel = panel_with(&[]);
    let early = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let err = run_pipeline(&panel, early, &PipelineConfig::default(), &NoEnrichment).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Core(CoreError::NoTradingDate { .. })
    ));
}

#[test]
fn missing_price_field_is_a_configuration_error() {
    let panel = panel_with(&[]);
    let config = PipelineConfig {
        price_field: Field::Open,
        indicator_source: Field::Close,
        ..Default::default()
    };
    let err = run_pipeline(&panel, reference(&panel), &config, &NoEnrichment).unwrap_err();
    match err {
        PipelineError::Core(e) => assert!(e.is_configuration()),
        other => panic!("unexpected error: {other}"),
    }
}

// ── 3. Latest values, enrichment and risk/return ──

#[test]
fn enrichment_and_risk_columns_reach_the_entries() {
    let panel = panel_with(&[]);
    let last_a = *panel.column(Field::AdjClose, "A").unwrap().last().unwrap();
    let high = last_a + 10.0;
    let enrichment = StaticEnrichment::new()
        .with("A", "name", "Alpha")
        .with("A", "high_52w", high);

    let out = run_pipeline(
        &panel,
        reference(&panel),
        &PipelineConfig::default(),
        &enrichment,
    )
    .unwrap();
    let a = &out.ranking[0];
    assert_eq!(a.extra["name"].as_str(), Some("Alpha"));
    assert_eq!(a.extra["price"].as_f64(), Some(last_a));

    // Constant true range of 2 gives ATR 2 and a stop 3 below the close.
    let stop = a.extra["STOP_ATR_14_1.5"].as_f64().unwrap();
    assert!((stop - (last_a - 3.0)).abs() < 1e-9);

    let distance = a.extra["distance"].as_f64().unwrap();
    let risk = a.extra["risk_pct"].as_f64().unwrap();
    let expected_distance = 10.0 / high * 100.0;
    let expected_risk = 3.0 / (last_a - 3.0) * 100.0;
    assert!((distance - expected_distance).abs() <= 0.005 + 1e-9);
    assert!((risk - expected_risk).abs() <= 0.005 + 1e-9);
    let ratio = a.extra["return_over_risk"].as_f64().unwrap();
    assert!((ratio - expected_distance / expected_risk).abs() <= 0.005 + 1e-9);

    // The score columns are not duplicated into the extras.
    assert!(!a.extra.contains_key("FR"));
    assert!(!a.extra.contains_key("p0"));

    let table = out.table.as_ref().unwrap();
    assert_eq!(table.tickers(), &["A".to_string()]);
    assert!(table.has_column("return_over_risk"));
}

#[test]
fn missing_high_52w_gives_null_metrics_in_json() {
    let panel = panel_with(&[]);
    let out = run_pipeline(&panel, reference(&panel), &PipelineConfig::default(), &NoEnrichment)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
    let a = &json["ranking"][0];
    assert_eq!(a["ticker"], "A");
    assert_eq!(a["FR_rank"], 100.0);
    assert!(a["high_52w"].is_null());
    assert!(a["distance"].is_null());
    assert!(a["return_over_risk"].is_null());
    assert!(a["risk_pct"].is_number());
    assert_eq!(json["summary"]["status"], "ok");
    assert!(json["summary"].get("message").is_none());
}

#[test]
fn latest_values_are_read_at_the_reference_date() {
    let panel = panel_over(400, &[]);
    let reference = panel.dates()[200];
    let close_a = panel.column(Field::AdjClose, "A").unwrap();
    assert!(close_a[200] < *close_a.last().unwrap());

    let out =
        run_pipeline(&panel, reference, &PipelineConfig::default(), &NoEnrichment).unwrap();
    assert_eq!(out.summary.latest_date, Some(reference));
    assert_eq!(out.summary.resolved_dates.last(), Some(&reference));
    let a = &out.ranking[0];
    assert_eq!(a.ticker, "A");
    assert_eq!(a.extra["price"].as_f64(), Some(close_a[200]));
    let stop = a.extra["STOP_ATR_14_1.5"].as_f64().unwrap();
    assert!((stop - (close_a[200] - 3.0)).abs() < 1e-9);

    let json: serde_json::Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
    assert_eq!(json["summary"]["latest_date"], reference.to_string());
}

#[test]
fn weekend_reference_reads_the_previous_trading_day() {
    let panel = panel_over(400, &[]);
    let dates = panel.dates();
    let row = (180..dates.len())
        .find(|&i| dates[i].weekday().number_from_monday() == 5)
        .unwrap();
    let saturday = dates[row] + Duration::days(1);

    let out =
        run_pipeline(&panel, saturday, &PipelineConfig::default(), &NoEnrichment).unwrap();
    assert_eq!(out.summary.reference_date, saturday);
    assert_eq!(out.summary.latest_date, Some(dates[row]));
    let close_a = panel.column(Field::AdjClose, "A").unwrap();
    assert_eq!(out.ranking[0].extra["price"].as_f64(), Some(close_a[row]));
}

#[test]
fn core_columns_are_valid_payload_fields() {
    let panel = panel_with(&[]);
    let config = PipelineConfig {
        min_fr_rank: 0.0,
        payload_fields: vec!["ticker".into(), "FR".into(), "FR_rank".into()],
        ..Default::default()
    };
    let out = run_pipeline(&panel, reference(&panel), &config, &NoEnrichment).unwrap();
    assert_eq!(out.ranking.len(), 3);
    let json: serde_json::Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
    assert_eq!(json["ranking"][0]["ticker"], "A");
    assert_eq!(json["ranking"][0]["FR_rank"], 100.0);
    assert!(json["ranking"][0]["FR"].is_number());
}

#[test]
fn clashing_enrichment_columns_are_dropped() {
    let panel = panel_with(&[]);
    let last_a = *panel.column(Field::AdjClose, "A").unwrap().last().unwrap();
    let enrichment = StaticEnrichment::new()
        .with("A", "price", 1.0)
        .with("A", "STOP_ATR_14_1.5", 1.0)
        .with("A", "FR", 9.0)
        .with("A", "distance", 5.0)
        .with("A", "sector", "Tech");

    let out = run_pipeline(
        &panel,
        reference(&panel),
        &PipelineConfig::default(),
        &enrichment,
    )
    .unwrap();
    let a = &out.ranking[0];
    assert_eq!(a.extra["price"].as_f64(), Some(last_a));
    assert!((a.extra["STOP_ATR_14_1.5"].as_f64().unwrap() - (last_a - 3.0)).abs() < 1e-9);
    assert!(a.score < 0.0);
    assert_eq!(a.extra["sector"].as_str(), Some("Tech"));
    // No 52-week high, so the pipeline's own distance is undefined.
    assert!(a.extra["distance"].is_null());
}

// ── 4. Pipeline with provider and cache ──

#[test]
fn cached_panel_is_reused_for_the_same_reference_date() {
    let provider = SyntheticPanelProvider::new(&["AAA", "BBB", "CCC", "DDD"]);
    let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();

    let first = pipeline.run(date, &provider, &NoEnrichment).unwrap();
    assert!(pipeline.cache().has(date));
    let second = pipeline.run(date, &provider, &NoEnrichment).unwrap();

    assert_eq!(pipeline.cache().len(), 1);
    assert_eq!(first.summary.panel_hash, second.summary.panel_hash);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.summary.total_universe, 4);
    assert!(!first.ranking.is_empty());
    assert!(first.summary.resolved_dates.iter().all(|d| *d <= date));
}

#[test]
fn cache_capacity_bounds_reference_dates() {
    let provider = SyntheticPanelProvider::new(&["AAA", "BBB"]);
    let config = PipelineConfig {
        cache_capacity: 1,
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(config).unwrap();
    let june = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    let july = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();

    pipeline.run(june, &provider, &NoEnrichment).unwrap();
    pipeline.run(july, &provider, &NoEnrichment).unwrap();

    assert_eq!(pipeline.cache().len(), 1);
    assert!(!pipeline.cache().has(june));
    assert_eq!(pipeline.cache().current_reference_date(), Some(july));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = PipelineConfig {
        macd_fast: 26,
        macd_slow: 12,
        ..Default::default()
    };
    assert!(matches!(
        Pipeline::new(config).unwrap_err(),
        PipelineError::Config(_)
    ));
}
