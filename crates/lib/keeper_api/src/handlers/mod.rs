//! Request handlers.

pub mod auth;
pub mod keychain;

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Upper bound on a single service call.
pub const SERVICE_DEADLINE: Duration = Duration::from_secs(5);

/// Run a service call under [`SERVICE_DEADLINE`]. Running out of time is an
/// internal error.
pub(crate) async fn with_deadline<T, E>(call: impl Future<Output = Result<T, E>>) -> AppResult<T>
where
    AppError: From<E>,
{
    match tokio::time::timeout(SERVICE_DEADLINE, call).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::Internal(format!(
            "service call exceeded {}s deadline",
            SERVICE_DEADLINE.as_secs()
        ))),
    }
}
