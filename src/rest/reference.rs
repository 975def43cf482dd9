//! Reference data endpoints.

use serde::Deserialize;

use crate::rest::client::{RestClient, RestError};
use crate::rest::models::{
    Dividend, Financial, LocaleName, MarketDescription, MarketHoliday, MarketStatus,
    ResultsResponse, Split, TickerDetails, TickerNews, TickerTypes, TickersResponse,
};
use crate::rest::options::{FinancialOptions, NewsOptions, TickerOptions};

#[derive(Deserialize)]
struct TickerTypesEnvelope {
    #[serde(default)]
    results: TickerTypes,
}

impl RestClient {
    pub async fn reference_tickers(
        &self,
        options: Option<&TickerOptions>,
    ) -> Result<TickersResponse, RestError> {
        self.get_json(&["v2", "reference", "tickers"], options).await
    }

    pub async fn reference_ticker_types(&self) -> Result<TickerTypes, RestError> {
        let envelope: TickerTypesEnvelope = self.fetch(&["v2", "reference", "types"]).await?;
        Ok(envelope.results)
    }

    pub async fn reference_ticker_details(&self, ticker: &str) -> Result<TickerDetails, RestError> {
        self.fetch(&["v1", "meta", "symbols", ticker, "company"]).await
    }

    pub async fn reference_ticker_news(
        &self,
        ticker: &str,
        options: Option<&NewsOptions>,
    ) -> Result<Vec<TickerNews>, RestError> {
        self.get_json(&["v1", "meta", "symbols", ticker, "news"], options)
            .await
    }

    pub async fn reference_markets(&self) -> Result<ResultsResponse<MarketDescription>, RestError> {
        self.fetch(&["v2", "reference", "markets"]).await
    }

    pub async fn reference_locales(&self) -> Result<ResultsResponse<LocaleName>, RestError> {
        self.fetch(&["v2", "reference", "locales"]).await
    }

    pub async fn reference_stock_splits(
        &self,
        ticker: &str,
    ) -> Result<ResultsResponse<Split>, RestError> {
        self.fetch(&["v2", "reference", "splits", ticker]).await
    }

    pub async fn reference_dividends(
        &self,
        ticker: &str,
    ) -> Result<ResultsResponse<Dividend>, RestError> {
        self.fetch(&["v2", "reference", "dividends", ticker]).await
    }

    pub async fn reference_financials(
        &self,
        ticker: &str,
        options: Option<&FinancialOptions>,
    ) -> Result<ResultsResponse<Financial>, RestError> {
        self.get_json(&["v2", "reference", "financials", ticker], options)
            .await
    }

    /// Current trading status of markets and exchanges.
    pub async fn reference_market_status(&self) -> Result<MarketStatus, RestError> {
        self.fetch(&["v1", "marketstatus", "now"]).await
    }

    pub async fn reference_market_holidays(&self) -> Result<Vec<MarketHoliday>, RestError> {
        self.fetch(&["v1", "marketstatus", "upcoming"]).await
    }
}
