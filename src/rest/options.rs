//! Query options and path parameters for REST endpoints.
//!
//! Option structs serialize into query pairs; unset fields are omitted.

use std::fmt;

use serde::Serialize;

macro_rules! path_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

path_enum! {
    /// Bar size unit for aggregate queries.
    pub enum Timespan {
        Minute => "minute",
        Hour => "hour",
        Day => "day",
        Week => "week",
        Month => "month",
        Quarter => "quarter",
        Year => "year",
    }
}

path_enum! {
    pub enum Market {
        Stocks => "stocks",
        Crypto => "crypto",
        Bonds => "mf",
        MoneyMarket => "mmf",
        Indices => "indices",
        Fx => "fx",
    }
}

path_enum! {
    pub enum Locale {
        Global => "global",
        Us => "us",
        Gb => "gb",
        Ca => "ca",
        Nl => "nl",
        Gr => "gr",
        Sp => "sp",
        De => "de",
        Pe => "pe",
        Dk => "dk",
        Fi => "fi",
        Ie => "ie",
        Pt => "pt",
        In => "in",
        Mx => "mx",
        Fr => "fr",
        Cn => "cn",
        Ch => "ch",
        Se => "se",
    }
}

path_enum! {
    /// Tick type for condition mappings.
    pub enum Tick {
        Trades => "trades",
        Quotes => "quotes",
    }
}

path_enum! {
    /// Snapshot ranking direction.
    pub enum Direction {
        Gainers => "gainers",
        Losers => "losers",
    }
}

path_enum! {
    pub enum Sort {
        Asc => "asc",
        Desc => "desc",
    }
}

path_enum! {
    pub enum TickerSort {
        Ticker => "ticker",
        TickerDesc => "-ticker",
    }
}

path_enum! {
    /// Reporting dimension for financials: annual, quarterly or trailing,
    /// each optionally as-reported (`*A`).
    pub enum FinancialType {
        Y => "Y",
        Ya => "YA",
        Q => "Q",
        Qa => "QA",
        T => "T",
        Ta => "TA",
    }
}

path_enum! {
    pub enum FinancialSort {
        ReportPeriod => "reportPeriod",
        ReportPeriodDesc => "-reportPeriod",
        CalendarDate => "calendarDate",
        CalendarDateDesc => "-calendarDate",
    }
}

/// Options shared by aggregate, trade and quote endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unadjusted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    /// Nanosecond SIP timestamp to resume a tick listing from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl RequestOptions {
    /// Page size used by the daily tick pagers when no options are given.
    pub const DAILY_PAGE_LIMIT: i64 = 50_000;

    pub fn with_limit(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<TickerSort>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticker_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<Market>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "perpage", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NewsOptions {
    #[serde(rename = "perpage", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FinancialOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub report_type: Option<FinancialType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<FinancialSort>,
}
