//! Stream - example of a cancellable lazy stream.
//!
//! This example demonstrates:
//! - Creating a stream handler with `stream_handler_fn`
//! - Consuming the stream returned by `create_stream`
//! - Canceling a stream part way through
//!
//! Run with `RUST_LOG=debug cargo run --example stream`.

use std::time::Duration;

use futures::StreamExt;
use mediator::{stream_handler_fn, CancellationToken, HandlerRegistry, Mediator, StreamRequest};
use tracing_subscriber::EnvFilter;

/// Produce `count` ticks, one every `interval`.
struct Ticks {
    count: u32,
    interval: Duration,
}

impl StreamRequest for Ticks {
    type Item = u32;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = HandlerRegistry::new();
    registry.add_stream_handler::<Ticks, _>(stream_handler_fn(|req: Ticks, _ctx| {
        async_stream::stream! {
            for i in 0..req.count {
                tokio::time::sleep(req.interval).await;
                yield Ok(i);
            }
        }
    }))?;
    let mediator = Mediator::new(registry);

    let mut ticks = mediator.create_stream(Ticks {
        count: 5,
        interval: Duration::from_millis(10),
    })?;
    while let Some(tick) = ticks.next().await {
        println!("tick {}", tick?);
    }

    let token = CancellationToken::new();
    let mut endless = mediator.create_stream_with(
        Ticks {
            count: u32::MAX,
            interval: Duration::from_millis(10),
        },
        token.clone(),
    )?;
    while let Some(tick) = endless.next().await {
        match tick {
            Ok(i) if i == 2 => {
                println!("tick {}, canceling", i);
                token.cancel();
            }
            Ok(i) => println!("tick {}", i),
            Err(err) => println!("stream ended: {}", err),
        }
    }

    Ok(())
}
