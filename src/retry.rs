//! Retry policy for transient AWS control-plane errors.
//!
//! Throttling and eventual-consistency errors are retried with bounded
//! exponential backoff; everything else surfaces on the first attempt.
//! Call sites pair this with a `when` classifier from [`crate::aws::error`]:
//!
//! ```ignore
//! use backon::Retryable;
//!
//! (|| async { client.put_role_policy().send().await })
//!     .retry(retry_policy())
//!     .when(error::is_transient)
//!     .notify(notify_retry("PutRolePolicy"))
//!     .await?;
//! ```

use backon::ExponentialBuilder;
use std::time::Duration;
use tracing::warn;

/// Maximum attempts for a single control-plane call (initial + retries)
const MAX_RETRIES: usize = 5;

/// Bounded exponential backoff for SDK calls.
pub fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(400))
        .with_max_delay(Duration::from_secs(8))
        .with_max_times(MAX_RETRIES)
        .with_jitter()
}

/// Standard retry log line, parameterized by the operation name.
pub fn notify_retry<E: std::fmt::Debug>(operation: &str) -> impl Fn(&E, Duration) + '_ {
    move |err, delay| {
        warn!(
            operation = %operation,
            delay_ms = delay.as_millis() as u64,
            error = ?err,
            "Transient AWS error, retrying"
        );
    }
}
