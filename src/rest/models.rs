//! Response records for the REST endpoints.
//!
//! Field names follow the provider's JSON keys via `serde(rename)`. Missing
//! fields decode to their defaults.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Envelope fields shared by most v2 responses.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommonResponse {
    pub ticker: String,
    pub status: String,
    pub adjusted: bool,
    #[serde(rename = "queryCount", alias = "query_count")]
    pub query_count: i64,
    #[serde(rename = "resultsCount", alias = "results_count")]
    pub results_count: i64,
    pub count: i64,
    pub page: i64,
    #[serde(rename = "perPage")]
    pub per_page: i64,
}

/// A `results` array together with the common envelope.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResultsResponse<T> {
    #[serde(flatten)]
    pub common: CommonResponse,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Bar {
    #[serde(rename = "T")]
    pub ticker: String,
    /// Window start, Unix milliseconds.
    #[serde(rename = "t")]
    pub time: i64,
    #[serde(rename = "v")]
    pub volume: f64,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "n")]
    pub trades: i64,
    #[serde(rename = "vw")]
    pub vwap: f64,
    #[serde(rename = "av")]
    pub accumulated_volume: i64,
}

/// Historic trade tick.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Trade {
    #[serde(rename = "I")]
    pub original_id: i64,
    #[serde(rename = "x")]
    pub exchange: i32,
    #[serde(rename = "p")]
    pub price: f64,
    #[serde(rename = "i")]
    pub trade_id: String,
    #[serde(rename = "e")]
    pub correction: i32,
    #[serde(rename = "r")]
    pub report_id: i32,
    /// Participant timestamp, Unix nanoseconds.
    #[serde(rename = "y")]
    pub exchange_time: i64,
    /// SIP timestamp, Unix nanoseconds. Used as the paging cursor.
    #[serde(rename = "t")]
    pub sip_time: i64,
    #[serde(rename = "f")]
    pub trf_time: i64,
    #[serde(rename = "c")]
    pub conditions: Vec<i32>,
    #[serde(rename = "q")]
    pub sequence: i64,
    #[serde(rename = "s")]
    pub size: i64,
    #[serde(rename = "z")]
    pub tape: i32,
}

/// Historic NBBO quote tick.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Quote {
    #[serde(rename = "y")]
    pub exchange_time: i64,
    #[serde(rename = "t")]
    pub sip_time: i64,
    #[serde(rename = "f")]
    pub trf_time: i64,
    #[serde(rename = "q")]
    pub sequence: i64,
    #[serde(rename = "c")]
    pub conditions: Vec<i32>,
    #[serde(rename = "i")]
    pub indicators: Vec<i32>,
    #[serde(rename = "p")]
    pub bid_price: f64,
    #[serde(rename = "x")]
    pub bid_exchange: i32,
    #[serde(rename = "s")]
    pub bid_size: i64,
    #[serde(rename = "P")]
    pub ask_price: f64,
    #[serde(rename = "X")]
    pub ask_exchange: i32,
    #[serde(rename = "S")]
    pub ask_size: i64,
    #[serde(rename = "z")]
    pub tape: i32,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LastTrade {
    pub cond1: i32,
    pub exchange: i32,
    pub price: f64,
    pub size: i64,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LastQuote {
    #[serde(rename = "bidprice")]
    pub bid_price: f64,
    #[serde(rename = "bidexchange")]
    pub bid_exchange: i32,
    #[serde(rename = "bidsize")]
    pub bid_size: i64,
    #[serde(rename = "askprice")]
    pub ask_price: f64,
    #[serde(rename = "askexchange")]
    pub ask_exchange: i32,
    #[serde(rename = "asksize")]
    pub ask_size: i64,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Snapshot {
    pub ticker: String,
    #[serde(rename = "todaysChange")]
    pub todays_change: f64,
    #[serde(rename = "todaysChangePerc")]
    pub todays_change_pct: f64,
    pub day: Bar,
    #[serde(rename = "prevDay")]
    pub prev_day: Bar,
    #[serde(rename = "lastQuote")]
    pub last_quote: LastQuote,
    #[serde(rename = "lastTrade")]
    pub last_trade: LastTrade,
    pub min: Bar,
    pub updated: i64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Ticker {
    pub ticker: String,
    pub name: String,
    pub market: String,
    pub locale: String,
    #[serde(rename = "type")]
    pub ticker_type: String,
    pub currency: String,
    pub active: bool,
    #[serde(rename = "primaryExch")]
    pub primary_exchange: String,
    pub updated: String,
    pub codes: Option<BTreeMap<String, String>>,
    pub attrs: Option<BTreeMap<String, Value>>,
    pub url: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TickersResponse {
    #[serde(flatten)]
    pub common: CommonResponse,
    #[serde(default)]
    pub tickers: Vec<Ticker>,
}

/// Ticker type code to description maps.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TickerTypes {
    pub types: BTreeMap<String, String>,
    #[serde(rename = "indexTypes")]
    pub index_types: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TickerDetails {
    pub logo: String,
    #[serde(rename = "listdate")]
    pub list_date: String,
    pub cik: String,
    pub bloomberg: String,
    pub figi: String,
    pub lei: String,
    pub sic: i64,
    pub country: String,
    pub industry: String,
    pub sector: String,
    #[serde(rename = "marketcap")]
    pub market_cap: i64,
    pub employees: i64,
    pub phone: String,
    pub ceo: String,
    pub url: String,
    pub description: String,
    pub exchange: String,
    pub name: String,
    pub symbol: String,
    #[serde(rename = "exchangeSymbol")]
    pub exchange_symbol: String,
    pub hq_address: String,
    pub hq_state: String,
    pub hq_country: String,
    #[serde(rename = "type")]
    pub ticker_type: String,
    pub updated: String,
    pub tags: Vec<String>,
    pub similar: Vec<String>,
    pub active: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TickerNews {
    pub symbols: Vec<String>,
    pub title: String,
    pub url: String,
    pub source: String,
    pub summary: String,
    pub image: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarketDescription {
    pub market: String,
    #[serde(rename = "desc")]
    pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocaleName {
    pub locale: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Split {
    pub ticker: String,
    #[serde(rename = "exDate")]
    pub ex_date: String,
    #[serde(rename = "paymentDate")]
    pub payment_date: String,
    #[serde(rename = "recordDate")]
    pub record_date: String,
    #[serde(rename = "declaredDate")]
    pub declared_date: String,
    pub ratio: f64,
    #[serde(rename = "tofactor")]
    pub to_factor: i64,
    #[serde(rename = "forfactor")]
    pub for_factor: i64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Dividend {
    pub ticker: String,
    #[serde(rename = "type")]
    pub dividend_type: String,
    #[serde(rename = "exDate")]
    pub ex_date: String,
    #[serde(rename = "paymentDate")]
    pub payment_date: String,
    #[serde(rename = "recordDate")]
    pub record_date: String,
    #[serde(rename = "declaredDate")]
    pub declared_date: String,
    pub amount: f64,
    pub qualified: String,
    pub flag: String,
}

/// One financial report.
///
/// Identity fields are typed; the numeric line items (`revenues`,
/// `netIncome`, `debtToEquityRatio`, ...) are kept by their provider key in
/// `metrics`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Financial {
    pub ticker: String,
    pub period: String,
    #[serde(rename = "calendarDate")]
    pub calendar_date: String,
    #[serde(rename = "reportPeriod")]
    pub report_period: String,
    pub updated: String,
    #[serde(flatten)]
    pub metrics: BTreeMap<String, Value>,
}

impl Financial {
    /// Returns a numeric line item by its provider key.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(Value::as_f64)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketStatus {
    pub market: String,
    #[serde(rename = "serverTime")]
    pub server_time: String,
    pub exchanges: BTreeMap<String, String>,
    pub currencies: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarketHoliday {
    pub exchange: String,
    pub name: String,
    pub status: String,
    pub date: String,
    pub open: String,
    pub close: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Exchange {
    pub id: i64,
    #[serde(rename = "type")]
    pub exchange_type: String,
    pub market: String,
    pub mic: String,
    pub name: String,
    pub tape: String,
}

/// Daily open/close summary for one ticker.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DailyOpenClose {
    pub status: String,
    pub from: String,
    pub symbol: String,
    pub volume: f64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    #[serde(rename = "preMarket")]
    pub pre_market: f64,
    #[serde(rename = "afterHours")]
    pub after_hours: f64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CryptoTrade {
    #[serde(rename = "p")]
    pub price: f64,
    #[serde(rename = "s")]
    pub size: f64,
    #[serde(rename = "x")]
    pub exchange: i32,
    #[serde(rename = "t")]
    pub time: i64,
    #[serde(rename = "c")]
    pub conditions: Vec<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CryptoDaily {
    pub symbol: String,
    #[serde(rename = "isUTC")]
    pub is_utc: bool,
    pub day: String,
    pub open: f64,
    pub close: f64,
    #[serde(rename = "openTrades")]
    pub open_trades: Vec<CryptoTrade>,
    #[serde(rename = "closingTrades")]
    pub closing_trades: Vec<CryptoTrade>,
}
