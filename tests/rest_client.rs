use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::NaiveDate;
use polygon_sdk::rest::options::{
    Direction, Locale, NewsOptions, RequestOptions, Sort, Tick, TickerOptions, Timespan,
};
use polygon_sdk::rest::{decode, RestClient, RestError};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const TEST_API_KEY: &str = "test-api-key";

type Requests = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

#[derive(Clone)]
struct ApiState {
    requests: Requests,
}

struct MockApi {
    client: RestClient,
    requests: Requests,
    shutdown_tx: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl MockApi {
    async fn start() -> Self {
        let requests: Requests = Arc::default();
        let app = Router::new().fallback(api_handler).with_state(ApiState {
            requests: Arc::clone(&requests),
        });
        let (addr, shutdown_tx, task) = spawn_server(app).await;
        let client = RestClient::new(SecretString::new(TEST_API_KEY.to_string()))
            .expect("build rest client")
            .with_base_url(format!("http://{addr}"));

        Self {
            client,
            requests,
            shutdown_tx,
            task,
        }
    }

    fn requests(&self) -> Vec<(String, HashMap<String, String>)> {
        self.requests.lock().expect("requests lock").clone()
    }

    async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        self.task.await.expect("mock http server task should join");
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn aggregates_send_key_and_options_and_decode_bars() {
    let api = MockApi::start().await;
    let options = RequestOptions {
        unadjusted: Some(true),
        sort: Some(Sort::Asc),
        ..RequestOptions::default()
    };

    let response = api
        .client
        .stock_aggregates(
            "AAPL",
            1,
            Timespan::Day,
            date(2020, 1, 2),
            date(2020, 1, 3),
            Some(&options),
        )
        .await
        .expect("aggregates");

    assert_eq!(response.common.ticker, "AAPL");
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[1].close, 297.43);

    let requests = api.requests();
    let (path, query) = &requests[0];
    assert_eq!(path, "/v2/aggs/ticker/AAPL/range/1/day/2020-01-02/2020-01-03");
    assert_eq!(query.get("apiKey").map(String::as_str), Some(TEST_API_KEY));
    assert_eq!(query.get("unadjusted").map(String::as_str), Some("true"));
    assert_eq!(query.get("sort").map(String::as_str), Some("asc"));
    assert!(!query.contains_key("limit"));
    api.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forex_and_crypto_reuse_shared_aggregate_routes() {
    let api = MockApi::start().await;

    let grouped = api
        .client
        .forex_grouped_daily(Locale::Global, date(2020, 1, 2), None)
        .await
        .expect("forex grouped daily");
    assert_eq!(grouped.results[0].ticker, "C:EURUSD");

    let daily = api
        .client
        .crypto_daily("BTC", "USD", date(2020, 1, 2))
        .await
        .expect("crypto daily");
    assert_eq!(daily.symbol, "BTC-USD");
    assert_eq!(daily.open_trades.len(), 1);

    let paths: Vec<String> = api.requests().into_iter().map(|(path, _)| path).collect();
    assert_eq!(
        paths,
        vec![
            "/v2/aggs/grouped/locale/global/market/fx/2020-01-02".to_string(),
            "/v1/open-close/crypto/BTC/USD/2020-01-02".to_string(),
        ]
    );
    api.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_success_status_carries_code_and_body() {
    let api = MockApi::start().await;

    let err = api
        .client
        .reference_ticker_details("NO PE")
        .await
        .expect_err("missing ticker");

    match &err {
        RestError::HttpStatus { status, message } => {
            assert_eq!(*status, StatusCode::NOT_FOUND);
            assert_eq!(message, r#"{"status":"NOT_FOUND","message":"ticker not found"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("404 Not Found: "));
    assert_eq!(api.requests()[0].0, "/v1/meta/symbols/NO%20PE/company");
    api.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn daily_trades_page_by_last_sip_timestamp() {
    let api = MockApi::start().await;

    let pages = api
        .client
        .stock_daily_trades("AAPL", date(2020, 1, 2), None)
        .await
        .expect("daily trades");

    let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 2, 1]);
    assert_eq!(pages[2][0].sip_time, 4);

    let requests = api.requests();
    let cursors: Vec<Option<&str>> = requests
        .iter()
        .map(|(_, query)| query.get("timestamp").map(String::as_str))
        .collect();
    assert_eq!(cursors, vec![None, Some("3"), Some("4")]);
    assert!(requests
        .iter()
        .all(|(_, query)| query.get("limit").map(String::as_str) == Some("50000")));
    api.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reference_endpoints_decode_envelopes() {
    let api = MockApi::start().await;

    let tickers = api
        .client
        .reference_tickers(Some(&TickerOptions {
            search: Some("apple".to_string()),
            per_page: Some(5),
            ..TickerOptions::default()
        }))
        .await
        .expect("tickers");
    assert_eq!(tickers.tickers[0].ticker, "AAPL");

    let types = api.client.reference_ticker_types().await.expect("types");
    assert_eq!(types.types.get("CS").map(String::as_str), Some("Common Stock"));
    assert_eq!(types.index_types.get("INDEX").map(String::as_str), Some("Index"));

    let news = api
        .client
        .reference_ticker_news("AAPL", Some(&NewsOptions { per_page: Some(1), page: None }))
        .await
        .expect("news");
    assert_eq!(news[0].title, "Apple earnings");

    let holidays = api
        .client
        .reference_market_holidays()
        .await
        .expect("holidays");
    assert_eq!(holidays[0].name, "Thanksgiving");

    let requests = api.requests();
    assert_eq!(requests[0].1.get("search").map(String::as_str), Some("apple"));
    assert_eq!(requests[0].1.get("perpage").map(String::as_str), Some("5"));
    assert_eq!(requests[2].1.get("perpage").map(String::as_str), Some("1"));
    api.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stock_lookups_unwrap_their_envelopes() {
    let api = MockApi::start().await;

    let last = api.client.stock_last_trade("AAPL").await.expect("last trade");
    assert_eq!(last.price, 300.5);

    let gainers = api
        .client
        .stock_snapshot_gainers_losers(Direction::Gainers)
        .await
        .expect("gainers");
    assert_eq!(gainers[0].ticker, "TSLA");
    assert_eq!(gainers[0].day.close, 510.0);

    let conditions = api
        .client
        .stock_condition_mappings(Tick::Trades)
        .await
        .expect("conditions");
    assert_eq!(conditions.get("1").map(String::as_str), Some("Regular"));

    let raw = api
        .client
        .get_bytes(&["v1", "last", "stocks", "AAPL"], None::<&RequestOptions>)
        .await
        .expect("raw body");
    let value: Value = decode(&raw).expect("decode raw body");
    assert_eq!(value["status"], "success");
    api.stop().await;
}

async fn api_handler(
    State(state): State<ApiState>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.get("apiKey").map(String::as_str) != Some(TEST_API_KEY) {
        return (StatusCode::UNAUTHORIZED, "missing apiKey").into_response();
    }
    let path = uri.path().to_string();
    state
        .requests
        .lock()
        .expect("requests lock")
        .push((path.clone(), query.clone()));

    let body = match path.as_str() {
        "/v2/aggs/ticker/AAPL/range/1/day/2020-01-02/2020-01-03" => json!({
            "ticker": "AAPL",
            "status": "OK",
            "adjusted": false,
            "queryCount": 2,
            "resultsCount": 2,
            "results": [
                {"v": 3.3e7, "vw": 298.2, "o": 296.24, "c": 300.35, "h": 300.6, "l": 295.19, "t": 1577941200000_i64, "n": 1},
                {"v": 3.6e7, "vw": 297.0, "o": 297.15, "c": 297.43, "h": 300.58, "l": 296.5, "t": 1578027600000_i64, "n": 1}
            ]
        }),
        "/v2/aggs/grouped/locale/global/market/fx/2020-01-02" => json!({
            "status": "OK",
            "resultsCount": 1,
            "results": [{"T": "C:EURUSD", "v": 1.0, "o": 1.12, "c": 1.11, "h": 1.13, "l": 1.10, "t": 1577923200000_i64}]
        }),
        "/v1/open-close/crypto/BTC/USD/2020-01-02" => json!({
            "symbol": "BTC-USD",
            "isUTC": true,
            "day": "2020-01-02T00:00:00Z",
            "open": 7175.0,
            "close": 6952.0,
            "openTrades": [{"p": 7175.0, "s": 0.5, "x": 1, "t": 1577923200000_i64, "c": [2]}],
            "closingTrades": []
        }),
        "/v1/meta/symbols/NO%20PE/company" => {
            return (
                StatusCode::NOT_FOUND,
                r#"{"status":"NOT_FOUND","message":"ticker not found"}"#,
            )
                .into_response();
        }
        "/v2/ticks/stocks/trades/AAPL/2020-01-02" => {
            let sip_times: &[i64] = match query.get("timestamp").map(String::as_str) {
                None => &[1, 2, 3],
                Some("3") => &[3, 4],
                _ => &[4],
            };
            let results: Vec<Value> = sip_times
                .iter()
                .map(|t| json!({"t": t, "p": 300.0, "s": 100, "x": 11, "i": t.to_string()}))
                .collect();
            json!({"ticker": "AAPL", "results_count": results.len(), "results": results})
        }
        "/v2/reference/tickers" => json!({
            "page": 1,
            "perPage": 5,
            "count": 1,
            "status": "OK",
            "tickers": [{"ticker": "AAPL", "name": "Apple Inc.", "market": "STOCKS", "locale": "US", "type": "CS", "active": true}]
        }),
        "/v2/reference/types" => json!({
            "status": "OK",
            "results": {"types": {"CS": "Common Stock"}, "indexTypes": {"INDEX": "Index"}}
        }),
        "/v1/meta/symbols/AAPL/news" => json!([
            {"symbols": ["AAPL"], "title": "Apple earnings", "source": "wire", "timestamp": "2020-01-02T13:00:00Z"}
        ]),
        "/v1/marketstatus/upcoming" => json!([
            {"exchange": "NYSE", "name": "Thanksgiving", "status": "closed", "date": "2020-11-26"}
        ]),
        "/v1/last/stocks/AAPL" => json!({
            "status": "success",
            "symbol": "AAPL",
            "last": {"price": 300.5, "size": 100, "exchange": 4, "cond1": 14, "timestamp": 1577986500000_i64}
        }),
        "/v2/snapshot/locale/us/markets/stocks/gainers" => json!({
            "status": "OK",
            "tickers": [{"ticker": "TSLA", "todaysChange": 12.5, "todaysChangePerc": 2.5, "day": {"c": 510.0}}]
        }),
        "/v1/meta/conditions/trades" => json!({"1": "Regular", "2": "Acquisition"}),
        _ => return (StatusCode::NOT_FOUND, "unknown route").into_response(),
    };

    Json(body).into_response()
}

async fn spawn_server(
    app: Router,
) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let addr = listener
        .local_addr()
        .expect("read mock server listener address");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("mock server should run");
    });
    (addr, shutdown_tx, task)
}
