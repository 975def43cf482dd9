//! Fetch daily bars and the previous close for a ticker.

use std::error::Error;

use chrono::NaiveDate;
use polygon_sdk::rest::options::{RequestOptions, Sort, Timespan};
use polygon_sdk::rest::RestClient;
use secrecy::SecretString;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("POLYGON_API_KEY")?;
    let client = RestClient::new(SecretString::new(api_key))?;

    let from = NaiveDate::from_ymd_opt(2020, 1, 2).ok_or("invalid from date")?;
    let to = NaiveDate::from_ymd_opt(2020, 1, 31).ok_or("invalid to date")?;
    let options = RequestOptions {
        sort: Some(Sort::Asc),
        ..RequestOptions::default()
    };

    let bars = client
        .stock_aggregates("AAPL", 1, Timespan::Day, from, to, Some(&options))
        .await?;
    for bar in &bars.results {
        println!(
            "t={} o={} h={} l={} c={} v={}",
            bar.time, bar.open, bar.high, bar.low, bar.close, bar.volume
        );
    }

    let previous = client.stock_previous_close("AAPL", None).await?;
    if let Some(bar) = previous.results.first() {
        println!("previous close={}", bar.close);
    }

    Ok(())
}
