//! Events - example of publishing notifications.
//!
//! This example demonstrates:
//! - Registering several notification handlers for one notification type
//! - Publishing under each `PublishStrategy`
//! - Inspecting an aggregated failure
//!
//! Run with `RUST_LOG=mediator=debug cargo run --example events`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mediator::{
    notification_handler_fn, CancellationToken, HandlerRegistry, Mediator, MediatorError,
    Notification, PublishStrategy,
};
use tracing_subscriber::EnvFilter;

/// Progress update broadcast to every subscriber.
#[derive(Clone, Debug)]
struct Progress {
    percent: u32,
}

impl Notification for Progress {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let total = Arc::new(AtomicU32::new(0));
    let mut registry = HandlerRegistry::new();

    registry.add_notification_handler::<Progress, _>(notification_handler_fn(
        |p: Progress, _ctx| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            println!("[console] {}%", p.percent);
            Ok(())
        },
    ));

    let sum = total.clone();
    registry.add_notification_handler::<Progress, _>(notification_handler_fn(
        move |p: Progress, _ctx| {
            sum.fetch_add(p.percent, Ordering::SeqCst);
            async { Ok(()) }
        },
    ));

    registry.add_notification_handler::<Progress, _>(notification_handler_fn(
        |p: Progress, _ctx| async move {
            if p.percent > 100 {
                Err(MediatorError::message(format!("{}% is out of range", p.percent)))
            } else {
                Ok(())
            }
        },
    ));

    let mediator = Mediator::builder()
        .registry(registry)
        .publish_strategy(PublishStrategy::Parallel)
        .build();

    for percent in [25, 50, 100] {
        mediator.publish(Progress { percent }).await?;
    }
    println!("sum of reported progress: {}", total.load(Ordering::SeqCst));

    for strategy in [
        PublishStrategy::Parallel,
        PublishStrategy::Sequential,
        PublishStrategy::SequentialStopOnFailure,
    ] {
        let result = mediator
            .publish_with_strategy(Progress { percent: 150 }, strategy, CancellationToken::new())
            .await;
        match result {
            Ok(()) => println!("{}: ok", strategy),
            Err(err) => println!("{}: {} ({} aggregated)", strategy, err, err.failures().len()),
        }
    }

    Ok(())
}
