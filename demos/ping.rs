//! Ping - example of request/response dispatch.
//!
//! This example demonstrates:
//! - Registering a request handler with `handler_fn`
//! - Wrapping it with `LoggingBehavior` and `ValidationBehavior`
//! - Sending typed and type-erased requests
//!
//! Run with `RUST_LOG=debug cargo run --example ping` to see the pipeline logs.

use mediator::{
    handler_fn, HandlerRegistry, LoggingBehavior, Mediator, MediatorError, Request,
    ValidationBehavior, ValidationFailure,
};
use tracing_subscriber::EnvFilter;

/// Request carrying a sequence number.
#[derive(Clone, Debug)]
struct Ping {
    seq: u32,
}

impl Request for Ping {
    type Response = String;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = HandlerRegistry::new();
    registry.add_request_handler::<Ping, _>(handler_fn(|ping: Ping, _ctx| async move {
        Ok(format!("pong {}", ping.seq))
    }))?;
    registry
        .add_behavior::<Ping, _>(LoggingBehavior::new())
        .add_behavior::<Ping, _>(ValidationBehavior::<Ping>::new().with(|ping: &Ping| {
            if ping.seq == 0 {
                vec![ValidationFailure::new("seq", "must be positive")]
            } else {
                Vec::new()
            }
        }));

    let mediator = Mediator::new(registry);

    for seq in 1..=3 {
        println!("{}", mediator.send(Ping { seq }).await?);
    }

    match mediator.send(Ping { seq: 0 }).await {
        Err(MediatorError::ValidationFailed(failures)) => {
            println!("rejected: {} failure(s)", failures.len())
        }
        other => println!("unexpected: {:?}", other),
    }

    let boxed = mediator.send_any(Box::new(Ping { seq: 42 })).await?;
    if let Some(reply) = boxed.downcast_ref::<String>() {
        println!("erased: {}", reply);
    }

    Ok(())
}
