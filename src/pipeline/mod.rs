//! Request pipeline: behaviors, processors, exception hooks and stream behaviors.
//!
//! Execution order for one `send`:
//!
//! ```text
//! pre-processors ─► behavior 1 ─► ... ─► behavior N ─► handler
//!                                                        │
//! post-processors ◄── behavior 1 ◄── ... ◄── behavior N ◄┘
//! ```
//!
//! Exception actions and handlers run when the behavior chain fails, before
//! post-processing.

mod behavior;
mod exception;
mod logging;
mod processor;
mod stream;
mod validation;

pub use behavior::{build_chain, Next, PipelineBehavior};
pub use exception::{RequestExceptionAction, RequestExceptionHandler};
pub use logging::LoggingBehavior;
pub use processor::{RequestPostProcessor, RequestPreProcessor};
pub use stream::{StreamNext, StreamPipelineBehavior};
pub use validation::{ValidationBehavior, Validator};
