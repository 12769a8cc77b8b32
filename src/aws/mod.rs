//! AWS client modules
//!
//! Thin wrappers around AWS SDK clients, one per resource family:
//! - S3: data lake bucket and sample objects
//! - IAM: Glue service role and inline policies
//! - Glue: catalog database and tables
//! - VPC: optional S3 gateway endpoint
//! - STS: account ID lookup
//!
//! Every client follows the same discipline: existence check before
//! create, "not found" tolerated on delete, transient errors retried
//! with bounded backoff.

pub mod account;
pub mod context;
pub mod error;
pub mod glue;
pub mod iam;
pub mod s3;
pub mod tags;
pub mod vpc;

// Core clients
pub use context::AwsContext;
pub use glue::{GlueClient, GlueOperations};
pub use iam::{IamClient, IamOperations};
pub use s3::{S3Client, S3Operations};
pub use vpc::{VpcClient, VpcOperations};

// Account lookup
pub use account::{get_current_account_id, AccountId};

// Error handling
pub use error::{classify_aws_error, AwsError};
