//! Subscribe to realtime quotes and print every decoded event.
//!
//! Before running:
//! - Export `POLYGON_API_KEY`.
//! - Optionally set `RUST_LOG=polygon_sdk=debug` to see session events.

use std::error::Error;

use polygon_sdk::stream::client::STOCKS_STREAM_ENDPOINT;
use polygon_sdk::stream::proto::{decode_events, StreamEvent};
use polygon_sdk::stream::session::get_stream;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("POLYGON_API_KEY")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let stream = get_stream(SecretString::new(api_key), STOCKS_STREAM_ENDPOINT).await?;
        stream.subscribe("Q.AAPL,Q.MSFT").await?;

        let errors = {
            let stream = stream.clone();
            tokio::spawn(async move {
                while let Some(err) = stream.next_error().await {
                    eprintln!("stream error: {err}");
                }
            })
        };

        let mut received = 0_usize;
        while let Some(payload) = stream.next_message().await {
            for event in decode_events(&payload)? {
                match event {
                    StreamEvent::Quote(quote) => println!(
                        "{} bid={}x{} ask={}x{}",
                        quote.symbol,
                        quote.bid_price,
                        quote.bid_size,
                        quote.ask_price,
                        quote.ask_size
                    ),
                    StreamEvent::Status(status) => {
                        println!("status={} {}", status.status, status.message)
                    }
                    other => println!("{other:?}"),
                }
            }
            received += 1;
            if received == 50 {
                break;
            }
        }

        stream.close().await?;
        let _ = errors.await;
        Ok::<(), Box<dyn Error>>(())
    })
}
