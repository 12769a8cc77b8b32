//! Teardown sequencing: delete the data lake resources in reverse
//! dependency order
//!
//! Every step tolerates "resource already absent", so teardown against
//! a partially provisioned (or empty) account completes cleanly.

use crate::aws::vpc::s3_service_name;
use crate::aws::{GlueOperations, IamOperations, S3Operations, VpcOperations};
use crate::config::LakeConfig;
use anyhow::{Context, Result};
use tracing::info;

/// Flags controlling which teardown steps run
#[derive(Debug, Clone, Default)]
pub struct TeardownOptions {
    /// Delete the S3 gateway VPC endpoint (default off)
    pub remove_vpc_endpoint: bool,
    /// Leave the bucket and its objects in place
    pub skip_bucket_removal: bool,
}

/// Run the teardown sequence.
///
/// Reverse of the setup order: Glue resources go before the IAM role
/// they reference, and the bucket goes last. The first failure aborts
/// the remaining sequence with the step name in the error context.
pub async fn run_teardown(
    config: &LakeConfig,
    options: &TeardownOptions,
    s3: &impl S3Operations,
    iam: &impl IamOperations,
    glue: &impl GlueOperations,
    vpc: &impl VpcOperations,
) -> Result<()> {
    info!(step = "glue-database", database = %config.database_name, "Deleting Glue database");
    glue.delete_database(&config.database_name)
        .await
        .context("Teardown step 'glue-database' failed")?;

    if options.remove_vpc_endpoint {
        info!(step = "vpc-endpoint", vpc_id = %config.vpc_id, "Deleting S3 gateway VPC endpoint");
        let deleted = vpc
            .delete_endpoint(&config.vpc_id, &s3_service_name(&config.region))
            .await
            .context("Teardown step 'vpc-endpoint' failed")?;
        info!(step = "vpc-endpoint", deleted, "VPC endpoint teardown done");
    }

    info!(step = "iam-role", role = %config.glue_role_name, "Deleting Glue service role");
    iam.delete_role(&config.glue_role_name)
        .await
        .context("Teardown step 'iam-role' failed")?;

    if options.skip_bucket_removal {
        info!(step = "bucket", "Leaving bucket in place (--skip-bucket-removal)");
    } else {
        info!(step = "bucket", bucket = %config.bucket_name, "Emptying and deleting bucket");
        s3.delete_bucket(&config.bucket_name)
            .await
            .context("Teardown step 'bucket' failed")?;
    }

    info!("Teardown complete");
    Ok(())
}
