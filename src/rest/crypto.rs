//! Crypto endpoints. Pairs use the `X:` ticker prefix, e.g. `X:BTCUSD`.

use chrono::NaiveDate;

use crate::rest::client::{iso_date, RestClient, RestError};
use crate::rest::models::{Bar, CryptoDaily, Exchange, ResultsResponse};
use crate::rest::options::{Locale, Market, RequestOptions, Timespan};

impl RestClient {
    pub async fn crypto_exchanges(&self) -> Result<Vec<Exchange>, RestError> {
        self.fetch(&["v1", "meta", "crypto-exchanges"]).await
    }

    pub async fn crypto_previous_close(
        &self,
        ticker: &str,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        self.stock_previous_close(ticker, options).await
    }

    pub async fn crypto_aggregates(
        &self,
        ticker: &str,
        multiplier: u32,
        timespan: Timespan,
        from: NaiveDate,
        to: NaiveDate,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        self.stock_aggregates(ticker, multiplier, timespan, from, to, options)
            .await
    }

    pub async fn crypto_grouped_daily(
        &self,
        locale: Locale,
        date: NaiveDate,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        self.stock_grouped_daily(locale, Market::Crypto, date, options)
            .await
    }

    /// Open, close and the opening/closing trades of a pair for one day.
    pub async fn crypto_daily(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<CryptoDaily, RestError> {
        let date = iso_date(date);
        self.fetch(&["v1", "open-close", "crypto", from, to, date.as_str()])
            .await
    }
}
