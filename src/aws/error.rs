//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! from `ProvideErrorMetadata` instead of string matching on Debug format.

use aws_sdk_s3::error::ProvideErrorMetadata;
use thiserror::Error;

/// AWS error categories for retry and delete-tolerance logic
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (treated as success during deletes)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Resource already exists (safe to ignore in create operations)
    #[error("Resource already exists")]
    AlreadyExists,

    /// Resource not yet visible to a dependent service (eventual
    /// consistency, retryable)
    #[error("Resource not yet propagated (eventual consistency)")]
    PropagationDelay,

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded")]
    Throttled,

    /// Resource still referenced by another (retryable, e.g. role with
    /// attached policies)
    #[error("Resource has dependent objects")]
    DependencyViolation,

    /// Permission denied (permanent, surfaced immediately)
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AwsError::PropagationDelay | AwsError::Throttled | AwsError::DependencyViolation
        )
    }

    /// Check if this is an "already exists" error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists)
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchBucket",
    "NoSuchKey",
    "NoSuchTagSet",
    "NotFound",
    "NoSuchEntity",
    "EntityNotFoundException",
    "InvalidVpcEndpointId.NotFound",
    "InvalidVpcID.NotFound",
    "InvalidRouteTableID.NotFound",
];

/// Known AWS error codes for "already exists" conditions
const ALREADY_EXISTS_CODES: &[&str] = &[
    "BucketAlreadyOwnedByYou",
    "EntityAlreadyExists",
    "AlreadyExistsException",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "SlowDown",
];

/// Known AWS error codes for eventual-consistency delays
const PROPAGATION_CODES: &[&str] = &["ConcurrentModificationException", "OperationTimeoutException"];

/// Known AWS error codes for dependency violations (resource still in use)
const DEPENDENCY_CODES: &[&str] = &["DependencyViolation", "DeleteConflict"];

/// Known AWS error codes for permission failures
const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => AwsError::AlreadyExists,
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if PROPAGATION_CODES.contains(&c) => AwsError::PropagationDelay,
        Some(c) if DEPENDENCY_CODES.contains(&c) => AwsError::DependencyViolation,
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify any SDK error that carries error metadata.
///
/// `SdkError<E>` implements `ProvideErrorMetadata` whenever the service
/// error `E` does, so this works directly on `send().await` failures.
pub fn classify_sdk<E: ProvideErrorMetadata>(err: &E) -> AwsError {
    classify_aws_error(err.code(), err.message())
}

/// `when` predicate for [`backon::Retryable`]: retry throttling and
/// eventual-consistency errors only.
pub fn is_transient<E: ProvideErrorMetadata>(err: &E) -> bool {
    classify_sdk(err).is_retryable()
}

/// Check whether an SDK error means the resource does not exist.
pub fn is_not_found<E: ProvideErrorMetadata>(err: &E) -> bool {
    classify_sdk(err).is_not_found()
}

/// Check whether an SDK error means the resource already exists.
pub fn is_already_exists<E: ProvideErrorMetadata>(err: &E) -> bool {
    classify_sdk(err).is_already_exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_aws_error(Some(code), Some("some message"));
            assert!(err.is_not_found(), "Expected NotFound for code: {code}");
        }
    }

    #[test]
    fn already_exists_codes() {
        for code in ALREADY_EXISTS_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(
                err.is_already_exists(),
                "Expected AlreadyExists for code: {code}"
            );
        }
    }

    #[test]
    fn throttling_codes() {
        for code in THROTTLING_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(err.is_retryable(), "Expected retryable for code: {code}");
            assert!(matches!(err, AwsError::Throttled));
        }
    }

    #[test]
    fn propagation_codes_are_retryable() {
        for code in PROPAGATION_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(matches!(err, AwsError::PropagationDelay));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn dependency_codes_are_retryable() {
        let err = classify_aws_error(Some("DeleteConflict"), Some("role has policies"));
        assert!(matches!(err, AwsError::DependencyViolation));
        assert!(err.is_retryable());

        let err = classify_aws_error(Some("DependencyViolation"), Some("in use"));
        assert!(err.is_retryable());
    }

    #[test]
    fn access_denied_is_not_retryable() {
        for code in ACCESS_DENIED_CODES {
            let err = classify_aws_error(Some(code), Some("no permission"));
            assert!(matches!(err, AwsError::AccessDenied { .. }));
            assert!(!err.is_retryable());
            assert!(!err.is_not_found());
        }
    }

    #[test]
    fn unknown_and_missing_codes() {
        let err = classify_aws_error(Some("SomeNewError"), Some("details"));
        assert!(matches!(err, AwsError::Sdk { .. }));
        assert!(!err.is_retryable());

        let err2 = classify_aws_error(None, Some("something failed"));
        assert!(matches!(err2, AwsError::Sdk { code: None, .. }));
    }

    #[test]
    fn aws_error_variant_checks() {
        assert!(AwsError::NotFound {
            message: "gone".to_string()
        }
        .is_not_found());
        assert!(!AwsError::Throttled.is_not_found());

        assert!(AwsError::PropagationDelay.is_retryable());
        assert!(AwsError::Throttled.is_retryable());
        assert!(AwsError::DependencyViolation.is_retryable());
        assert!(!AwsError::AlreadyExists.is_retryable());
    }
}
