//! Forex endpoints. Currency pairs use the `C:` ticker prefix, e.g. `C:EURUSD`.

use chrono::NaiveDate;

use crate::rest::client::{RestClient, RestError};
use crate::rest::models::{Bar, ResultsResponse};
use crate::rest::options::{Locale, Market, RequestOptions, Timespan};

impl RestClient {
    pub async fn forex_previous_close(
        &self,
        ticker: &str,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        self.stock_previous_close(ticker, options).await
    }

    pub async fn forex_aggregates(
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

    pub async fn forex_grouped_daily(
        &self,
        locale: Locale,
        date: NaiveDate,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        self.stock_grouped_daily(locale, Market::Fx, date, options)
            .await
    }
}
