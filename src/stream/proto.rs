//! Wire messages exchanged with the realtime feed.
//!
//! Outbound commands are JSON objects of the form
//! `{"action": "...", "params": "..."}`. Inbound frames are JSON arrays of
//! objects tagged by their `ev` field.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Status value the feed reports after a successful `auth` command.
pub const AUTH_SUCCESS: &str = "auth_success";

/// Action carried by an outbound command.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Auth,
    Subscribe,
    Unsubscribe,
}

/// Outbound command sent over the realtime connection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientMessage {
    pub action: ClientAction,
    pub params: String,
}

impl ClientMessage {
    pub fn auth(api_key: impl Into<String>) -> Self {
        Self {
            action: ClientAction::Auth,
            params: api_key.into(),
        }
    }

    pub fn subscribe(channels: impl Into<String>) -> Self {
        Self {
            action: ClientAction::Subscribe,
            params: channels.into(),
        }
    }

    pub fn unsubscribe(channels: impl Into<String>) -> Self {
        Self {
            action: ClientAction::Unsubscribe,
            params: channels.into(),
        }
    }

    /// Encodes the command as a JSON text frame payload.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a command from a JSON text frame payload.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Server status message, sent as the connection greeting and as the reply
/// to an `auth` command.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMsg {
    #[serde(rename = "ev", default)]
    pub event: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl StatusMsg {
    pub fn is_auth_success(&self) -> bool {
        self.status.eq_ignore_ascii_case(AUTH_SUCCESS)
    }
}

/// Trade or quote condition field.
///
/// The feed sends this field as a single code, a list of codes, or
/// occasionally a string; anything else is kept verbatim in `Unknown`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Conditions {
    #[default]
    None,
    Code(i64),
    Codes(Vec<i64>),
    Text(String),
    Unknown(Value),
}

impl Conditions {
    /// Returns the condition codes as a list, empty for non-numeric shapes.
    pub fn codes(&self) -> Vec<i64> {
        match self {
            Self::Code(code) => vec![*code],
            Self::Codes(codes) => codes.clone(),
            Self::None | Self::Text(_) | Self::Unknown(_) => Vec::new(),
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::Number(ref number) => match number.as_i64() {
                Some(code) => Self::Code(code),
                None => Self::Unknown(value),
            },
            Value::String(text) => Self::Text(text),
            Value::Array(ref items) => {
                let codes: Option<Vec<i64>> = items.iter().map(Value::as_i64).collect();
                match codes {
                    Some(codes) => Self::Codes(codes),
                    None => Self::Unknown(value),
                }
            }
            other => Self::Unknown(other),
        }
    }
}

impl<'de> Deserialize<'de> for Conditions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Trade record pushed on `T.*` channels.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StreamTrade {
    /// Ticker symbol.
    #[serde(rename = "sym", default)]
    pub symbol: String,
    /// Exchange identifier.
    #[serde(rename = "x", default)]
    pub exchange: i32,
    /// Trade identifier assigned by the exchange.
    #[serde(rename = "i", default)]
    pub trade_id: String,
    /// Trade price.
    #[serde(rename = "p", default)]
    pub price: f64,
    /// Trade size in shares.
    #[serde(rename = "s", default)]
    pub size: i64,
    /// Trade time in Unix milliseconds.
    #[serde(rename = "t", default)]
    pub timestamp: i64,
    /// Trade condition codes.
    #[serde(rename = "c", default)]
    pub conditions: Conditions,
    /// Tape (1 = NYSE, 2 = AMEX, 3 = Nasdaq).
    #[serde(rename = "z", default)]
    pub tape: i32,
}

/// Quote record pushed on `Q.*` channels.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StreamQuote {
    /// Ticker symbol.
    #[serde(rename = "sym", default)]
    pub symbol: String,
    /// Quote condition.
    #[serde(rename = "c", default)]
    pub condition: Conditions,
    /// Bid exchange identifier.
    #[serde(rename = "bx", default)]
    pub bid_exchange: i32,
    /// Ask exchange identifier.
    #[serde(rename = "ax", default)]
    pub ask_exchange: i32,
    /// Bid price.
    #[serde(rename = "bp", default)]
    pub bid_price: f64,
    /// Ask price.
    #[serde(rename = "ap", default)]
    pub ask_price: f64,
    /// Bid size in round lots.
    #[serde(rename = "bs", default)]
    pub bid_size: i64,
    /// Ask size in round lots.
    #[serde(rename = "as", default)]
    pub ask_size: i64,
    /// Quote time in Unix milliseconds.
    #[serde(rename = "t", default)]
    pub timestamp: i64,
    /// Tape (1 = NYSE, 2 = AMEX, 3 = Nasdaq).
    #[serde(rename = "z", default)]
    pub tape: i32,
}

/// Aggregate record pushed on `A.*` (per second) and `AM.*` (per minute)
/// channels.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StreamAggregate {
    /// Ticker symbol.
    #[serde(rename = "sym", default)]
    pub symbol: String,
    /// Volume traded in this window.
    #[serde(rename = "v", default)]
    pub volume: i64,
    /// Volume accumulated over the day.
    #[serde(rename = "av", default)]
    pub accumulated_volume: i64,
    /// Official opening price of the day.
    #[serde(rename = "op", default)]
    pub official_open: f64,
    /// Volume-weighted average price of this window.
    #[serde(rename = "vw", default)]
    pub vwap: f64,
    /// Opening price of this window.
    #[serde(rename = "o", default)]
    pub open: f64,
    /// Closing price of this window.
    #[serde(rename = "c", default)]
    pub close: f64,
    /// Highest price of this window.
    #[serde(rename = "h", default)]
    pub high: f64,
    /// Lowest price of this window.
    #[serde(rename = "l", default)]
    pub low: f64,
    /// Volume-weighted average price of the day.
    #[serde(rename = "a", default)]
    pub average: f64,
    /// Average trade size of this window.
    #[serde(rename = "z", default)]
    pub average_trade_size: i64,
    /// Window start in Unix milliseconds.
    #[serde(rename = "s", default)]
    pub start_timestamp: i64,
    /// Window end in Unix milliseconds.
    #[serde(rename = "e", default)]
    pub end_timestamp: i64,
}

/// One decoded entry of an inbound data frame.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Trade(StreamTrade),
    Quote(StreamQuote),
    /// Second (`A`) or minute (`AM`) aggregate; `minute` tells which.
    Aggregate {
        minute: bool,
        aggregate: StreamAggregate,
    },
    Status(StatusMsg),
    /// Entry with an unrecognised `ev` tag, or one that failed to decode.
    Unknown(Value),
}

impl StreamEvent {
    fn from_value(value: Value) -> Self {
        let tag = value.get("ev").and_then(Value::as_str).map(str::to_owned);
        let decoded = match tag.as_deref() {
            Some("T") => serde_json::from_value(value.clone()).map(Self::Trade),
            Some("Q") => serde_json::from_value(value.clone()).map(Self::Quote),
            Some(ev @ ("A" | "AM")) => {
                let minute = ev == "AM";
                serde_json::from_value(value.clone())
                    .map(|aggregate| Self::Aggregate { minute, aggregate })
            }
            Some("status") => serde_json::from_value(value.clone()).map(Self::Status),
            _ => return Self::Unknown(value),
        };
        decoded.unwrap_or(Self::Unknown(value))
    }
}

/// Decodes a raw data frame delivered by the stream session.
///
/// The frame must be a JSON array; individual entries that do not match a
/// known record shape come back as [`StreamEvent::Unknown`] instead of
/// failing the whole frame.
pub fn decode_events(payload: &[u8]) -> Result<Vec<StreamEvent>, serde_json::Error> {
    let entries: Vec<Value> = serde_json::from_slice(payload)?;
    Ok(entries.into_iter().map(StreamEvent::from_value).collect())
}
