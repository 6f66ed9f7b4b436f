//! E2E test for one render cycle.
//!
//! Config YAML → file-backed query executor (cached) + HTTP candle feed
//! (wiremock) → render use case → JSON files on disk.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tokenization_metrics::application::use_cases::RenderDashboard;
use tokenization_metrics::config::load_config_from_string;
use tokenization_metrics::dispatch::FetchDispatcher;
use tokenization_metrics::infrastructure::output::{REPORT_FILE, write_render_output};
use tokenization_metrics::infrastructure::price_feed::CandlePriceFeed;
use tokenization_metrics::infrastructure::query::{CachedQueryExecutor, FileQueryExecutor};

fn write_result(dir: &Path, name: &str, body: &serde_json::Value) {
    std::fs::write(dir.join(format!("{name}.json")), body.to_string()).unwrap();
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn render_cycle_writes_chart_tables() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    write_result(
        data.path(),
        "transactions",
        &json!({
            "columns": ["mt", "transactions"],
            "rows": [
                ["2024-01-01", 10],
                ["2024-01-20", 2],
                ["2024-03-01", 5]
            ]
        }),
    );
    write_result(
        data.path(),
        "commodities",
        &json!({
            "columns": ["date", "supply_gold"],
            "rows": [["2024-01-01", 1], ["2024-01-02", 1], ["2024-01-03", 2]]
        }),
    );

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/246516580/candles"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/246516580/candles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"timestamp": 1_704_067_200, "close": 2000},
            {"timestamp": 1_704_240_000, "close": 2100}
        ])))
        .mount(&server)
        .await;

    let yaml = format!(
        r"
price_feed:
  base_url: {base_url}
query:
  data_dir: {data_dir}
output_dir: {output_dir}
metrics:
  - name: transactions
    query: select mt, transactions from card_tx
    series:
      key: mt
      metrics: [transactions]
    kpi:
      column: transactions
enrichment:
  - name: commodities
    query: select date, supply_gold from supply
    assets:
      - column_name: supply_gold
        asset_identifier: '246516580'
        asset_display_name: gold
",
        base_url = server.uri(),
        data_dir = data.path().display(),
        output_dir = out.path().display(),
    );
    let config = load_config_from_string(&yaml).unwrap();

    let executor = Arc::new(CachedQueryExecutor::new(
        FileQueryExecutor::new(&config.query.data_dir),
        Duration::from_secs(config.cache.ttl_secs),
    ));
    let feed = Arc::new(CandlePriceFeed::new(&config.price_feed).unwrap());
    let output = RenderDashboard::new(executor, feed, FetchDispatcher::new(config.dispatch.clone()))
        .with_today(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
        .execute(&config.dashboard)
        .await;
    assert!(output.is_complete(), "{:?}", output.failures);

    write_render_output(Path::new(&config.output_dir), &output)
        .await
        .unwrap();

    assert_eq!(
        read_json(&out.path().join("transactions.json")),
        json!([
            {"period": "2024-01-01", "transactions": 12, "cumulative_transactions": 12},
            {"period": "2024-02-01", "transactions": 0, "cumulative_transactions": 12},
            {"period": "2024-03-01", "transactions": 5, "cumulative_transactions": 17}
        ])
    );

    let commodities = read_json(&out.path().join("commodities.json"));
    let gold: Vec<_> = commodities
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["gold_usd"].clone())
        .collect();
    assert_eq!(gold, vec![json!(2000), json!(2000), json!(4200)]);
    assert_eq!(commodities[2]["total_usd"], json!(4200));

    let report = read_json(&out.path().join(REPORT_FILE));
    assert_eq!(report["rendered"], json!(["commodities", "transactions"]));
    assert_eq!(report["kpis"]["transactions"]["display"], json!("5"));
}
