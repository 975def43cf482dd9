//! Stock endpoints.
//!
//! Bar, tick and snapshot listings can be large; they are fetched as raw
//! bytes and decoded in one pass with [`decode`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::rest::client::{decode, iso_date, RestClient, RestError};
use crate::rest::models::{
    Bar, DailyOpenClose, Exchange, LastQuote, LastTrade, Quote, ResultsResponse, Snapshot, Trade,
};
use crate::rest::options::{Direction, Locale, Market, RequestOptions, Tick, Timespan};

#[derive(Deserialize)]
struct TicksEnvelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct LastEnvelope<T> {
    last: T,
}

#[derive(Deserialize)]
struct SnapshotsEnvelope {
    #[serde(default)]
    tickers: Vec<Snapshot>,
}

#[derive(Deserialize)]
struct SnapshotEnvelope {
    ticker: Snapshot,
}

impl RestClient {
    pub async fn stock_exchanges(&self) -> Result<Vec<Exchange>, RestError> {
        self.fetch(&["v1", "meta", "exchanges"]).await
    }

    pub async fn stock_previous_close(
        &self,
        ticker: &str,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        self.get_json(&["v2", "aggs", "ticker", ticker, "prev"], options)
            .await
    }

    /// Bars of `multiplier` x `timespan` between two dates, inclusive.
    pub async fn stock_aggregates(
        &self,
        ticker: &str,
        multiplier: u32,
        timespan: Timespan,
        from: NaiveDate,
        to: NaiveDate,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        let multiplier = multiplier.to_string();
        let (from, to) = (iso_date(from), iso_date(to));
        let body = self
            .get_bytes(
                &[
                    "v2",
                    "aggs",
                    "ticker",
                    ticker,
                    "range",
                    multiplier.as_str(),
                    timespan.as_str(),
                    from.as_str(),
                    to.as_str(),
                ],
                options,
            )
            .await?;
        decode(&body)
    }

    /// Daily bars for every ticker of a market on one date.
    pub async fn stock_grouped_daily(
        &self,
        locale: Locale,
        market: Market,
        date: NaiveDate,
        options: Option<&RequestOptions>,
    ) -> Result<ResultsResponse<Bar>, RestError> {
        let date = iso_date(date);
        let body = self
            .get_bytes(
                &[
                    "v2",
                    "aggs",
                    "grouped",
                    "locale",
                    locale.as_str(),
                    "market",
                    market.as_str(),
                    date.as_str(),
                ],
                options,
            )
            .await?;
        decode(&body)
    }

    /// One page of historic trades.
    pub async fn stock_trades(
        &self,
        ticker: &str,
        date: NaiveDate,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<Trade>, RestError> {
        let date = iso_date(date);
        let body = self
            .get_bytes(&["v2", "ticks", "stocks", "trades", ticker, date.as_str()], options)
            .await?;
        Ok(decode::<TicksEnvelope<Trade>>(&body)?.results)
    }

    /// Every trade of the day, one entry per page.
    ///
    /// Each request resumes at the SIP timestamp of the previous page's last
    /// trade. Paging stops after a page with at most one trade.
    pub async fn stock_daily_trades(
        &self,
        ticker: &str,
        date: NaiveDate,
        options: Option<RequestOptions>,
    ) -> Result<Vec<Vec<Trade>>, RestError> {
        let mut options = options
            .unwrap_or_else(|| RequestOptions::with_limit(RequestOptions::DAILY_PAGE_LIMIT));
        let mut pages = Vec::new();

        loop {
            let page = self.stock_trades(ticker, date, Some(&options)).await?;
            let cursor = (page.len() > 1)
                .then(|| page.last().map(|trade| trade.sip_time))
                .flatten();
            debug!(event = "rest_page_fetched", ticker, len = page.len());
            pages.push(page);
            match cursor {
                Some(timestamp) => options.timestamp = Some(timestamp),
                None => break,
            }
        }

        Ok(pages)
    }

    /// One page of historic NBBO quotes.
    pub async fn stock_quotes(
        &self,
        ticker: &str,
        date: NaiveDate,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<Quote>, RestError> {
        let date = iso_date(date);
        let body = self
            .get_bytes(&["v2", "ticks", "stocks", "nbbo", ticker, date.as_str()], options)
            .await?;
        Ok(decode::<TicksEnvelope<Quote>>(&body)?.results)
    }

    /// Every quote of the day, one entry per page. Pages the same way as
    /// [`RestClient::stock_daily_trades`].
    pub async fn stock_daily_quotes(
        &self,
        ticker: &str,
        date: NaiveDate,
        options: Option<RequestOptions>,
    ) -> Result<Vec<Vec<Quote>>, RestError> {
        let mut options = options
            .unwrap_or_else(|| RequestOptions::with_limit(RequestOptions::DAILY_PAGE_LIMIT));
        let mut pages = Vec::new();

        loop {
            let page = self.stock_quotes(ticker, date, Some(&options)).await?;
            let cursor = (page.len() > 1)
                .then(|| page.last().map(|quote| quote.sip_time))
                .flatten();
            debug!(event = "rest_page_fetched", ticker, len = page.len());
            pages.push(page);
            match cursor {
                Some(timestamp) => options.timestamp = Some(timestamp),
                None => break,
            }
        }

        Ok(pages)
    }

    pub async fn stock_last_trade(&self, ticker: &str) -> Result<LastTrade, RestError> {
        let envelope: LastEnvelope<LastTrade> =
            self.fetch(&["v1", "last", "stocks", ticker]).await?;
        Ok(envelope.last)
    }

    pub async fn stock_last_quote(&self, ticker: &str) -> Result<LastQuote, RestError> {
        let envelope: LastEnvelope<LastQuote> =
            self.fetch(&["v1", "last_quote", "stocks", ticker]).await?;
        Ok(envelope.last)
    }

    pub async fn stock_daily(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<DailyOpenClose, RestError> {
        let date = iso_date(date);
        self.fetch(&["v1", "open-close", ticker, date.as_str()]).await
    }

    /// Condition code to name mapping for trades or quotes.
    pub async fn stock_condition_mappings(
        &self,
        tick: Tick,
    ) -> Result<BTreeMap<String, String>, RestError> {
        self.fetch(&["v1", "meta", "conditions", tick.as_str()])
            .await
    }

    pub async fn stock_snapshot_all(&self) -> Result<Vec<Snapshot>, RestError> {
        let body = self
            .fetch_bytes(&["v2", "snapshot", "locale", "us", "markets", "stocks", "tickers"])
            .await?;
        Ok(decode::<SnapshotsEnvelope>(&body)?.tickers)
    }

    pub async fn stock_snapshot_single(&self, ticker: &str) -> Result<Snapshot, RestError> {
        let envelope: SnapshotEnvelope = self
            .fetch(&[
                "v2", "snapshot", "locale", "us", "markets", "stocks", "tickers", ticker,
            ])
            .await?;
        Ok(envelope.ticker)
    }

    /// Top 20 gainers or losers of the day.
    pub async fn stock_snapshot_gainers_losers(
        &self,
        direction: Direction,
    ) -> Result<Vec<Snapshot>, RestError> {
        let body = self
            .fetch_bytes(&[
                "v2",
                "snapshot",
                "locale",
                "us",
                "markets",
                "stocks",
                direction.as_str(),
            ])
            .await?;
        Ok(decode::<SnapshotsEnvelope>(&body)?.tickers)
    }
}
