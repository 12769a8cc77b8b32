//! lakestack - AWS data lake provisioning and teardown
//!
//! This crate provisions the fixed set of AWS resources backing the STEDI
//! data lake exercise (S3 bucket + sample objects, Glue service role with
//! inline policies, optional S3 gateway VPC endpoint, Glue database and
//! tables) and tears them down again, in dependency order, with
//! idempotent resource clients.

pub mod aws;
pub mod config;
pub mod orchestrator;
pub mod retry;
pub mod schema;
pub mod wait;
