//! Request validation behavior.

use std::marker::PhantomData;
use std::sync::Arc;

use super::behavior::{Next, PipelineBehavior};
use crate::error::{MediatorError, Result, ValidationFailure};
use crate::handler::{BoxFuture, RequestContext};
use crate::message::Request;

/// Checks a request and reports every field-level failure.
pub trait Validator<R: Request>: Send + Sync + 'static {
    /// Validate `request`; an empty vector means valid.
    fn validate(&self, request: &R) -> Vec<ValidationFailure>;
}

impl<R, F> Validator<R> for F
where
    R: Request,
    F: Fn(&R) -> Vec<ValidationFailure> + Send + Sync + 'static,
{
    fn validate(&self, request: &R) -> Vec<ValidationFailure> {
        self(request)
    }
}

/// Runs every validator and fails with [`MediatorError::ValidationFailed`]
/// without calling the rest of the pipeline if any of them reports a failure.
pub struct ValidationBehavior<R: Request> {
    validators: Vec<Arc<dyn Validator<R>>>,
    _phantom: PhantomData<fn(R)>,
}

impl<R: Request> ValidationBehavior<R> {
    /// Create a behavior with no validators.
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Add a validator.
    pub fn with<V: Validator<R>>(mut self, validator: V) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Collect the failures of every validator.
    pub fn check(&self, request: &R) -> Vec<ValidationFailure> {
        self.validators
            .iter()
            .flat_map(|validator| validator.validate(request))
            .collect()
    }
}

impl<R: Request> Default for ValidationBehavior<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> PipelineBehavior<R> for ValidationBehavior<R> {
    fn handle<'a>(
        &'a self,
        request: &'a R,
        ctx: RequestContext,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, Result<R::Response>> {
        Box::pin(async move {
            let failures = self.check(request);
            if !failures.is_empty() {
                tracing::debug!(
                    "{} failed validation with {} failure(s)",
                    ctx.message_type(),
                    failures.len()
                );
                return Err(MediatorError::ValidationFailed(failures));
            }
            next.run().await
        })
    }
}
