//! Page through every trade of one session.
//!
//! Pages hold up to 50,000 trades; a busy ticker takes many requests.

use std::error::Error;

use chrono::NaiveDate;
use polygon_sdk::rest::RestClient;
use secrecy::SecretString;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("POLYGON_API_KEY")?;
    let ticker = std::env::args().nth(1).unwrap_or_else(|| "AAPL".to_string());
    let date = NaiveDate::from_ymd_opt(2020, 1, 2).ok_or("invalid date")?;

    let client = RestClient::new(SecretString::new(api_key))?;
    let pages = client.stock_daily_trades(&ticker, date, None).await?;

    let total: usize = pages.iter().map(Vec::len).sum();
    println!("{ticker} {date}: {} pages, {total} trades", pages.len());
    if let Some(last) = pages.last().and_then(|page| page.last()) {
        println!("last trade price={} size={} sip_time={}", last.price, last.size, last.sip_time);
    }

    Ok(())
}
