//! Setup sequencing: create the data lake resources in dependency order
//!
//! Order matters: the bucket must exist before sample data is uploaded
//! and before any Glue table points at it, and the database must exist
//! before its tables.

use crate::aws::iam::{glue_service_policy, s3_access_policy};
use crate::aws::vpc::s3_service_name;
use crate::aws::{GlueOperations, IamOperations, S3Operations, VpcOperations};
use crate::config::LakeConfig;
use crate::schema::discover_table_schemas;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Flags controlling which setup steps run
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Create the S3 gateway VPC endpoint (default off)
    pub init_vpc_endpoint: bool,
    /// Skip the sample-data upload
    pub skip_load_data: bool,
}

/// Run the setup sequence.
///
/// Steps run strictly in order; the first failure aborts the remaining
/// sequence with the step name in the error context. Already-existing
/// resources are tolerated by the underlying `ensure_*` operations, so
/// re-running setup is safe.
pub async fn run_setup(
    config: &LakeConfig,
    data_dir: &Path,
    schema_dir: &Path,
    options: &SetupOptions,
    s3: &impl S3Operations,
    iam: &impl IamOperations,
    glue: &impl GlueOperations,
    vpc: &impl VpcOperations,
) -> Result<()> {
    // Load every schema up front so a malformed file aborts the run
    // before any resource is touched.
    let schemas =
        discover_table_schemas(schema_dir).context("Setup step 'discover-schemas' failed")?;
    info!(count = schemas.len(), "Discovered table schemas");

    info!(step = "bucket", bucket = %config.bucket_name, "Ensuring S3 bucket exists");
    s3.ensure_bucket_exists(&config.bucket_name)
        .await
        .context("Setup step 'bucket' failed")?;

    if options.skip_load_data {
        info!(step = "load-data", "Skipping sample data upload (--skip-load-data)");
    } else {
        info!(step = "load-data", data_dir = %data_dir.display(), "Uploading sample data");
        let uploaded = s3
            .upload_sample_data(&config.bucket_name, data_dir)
            .await
            .context("Setup step 'load-data' failed")?;
        info!(step = "load-data", uploaded, "Sample data uploaded");
    }

    info!(step = "iam-role", role = %config.glue_role_name, "Ensuring Glue service role exists");
    iam.ensure_role_exists(&config.glue_role_name)
        .await
        .context("Setup step 'iam-role' failed")?;
    iam.attach_inline_policy(
        &config.glue_role_name,
        &config.s3_role_policy_name,
        &s3_access_policy(&config.bucket_name),
    )
    .await
    .context("Setup step 'iam-role' failed")?;
    iam.attach_inline_policy(
        &config.glue_role_name,
        &config.glue_role_policy_name,
        &glue_service_policy(),
    )
    .await
    .context("Setup step 'iam-role' failed")?;

    if options.init_vpc_endpoint {
        info!(step = "vpc-endpoint", vpc_id = %config.vpc_id, "Creating S3 gateway VPC endpoint");
        let endpoint_id = vpc
            .create_endpoint(
                &config.vpc_id,
                &config.route_table_id,
                &s3_service_name(&config.region),
            )
            .await
            .context("Setup step 'vpc-endpoint' failed")?;
        info!(step = "vpc-endpoint", endpoint_id = %endpoint_id, "VPC endpoint ready");
    }

    info!(step = "glue-database", database = %config.database_name, "Ensuring Glue database exists");
    glue.ensure_database_exists(&config.database_name)
        .await
        .context("Setup step 'glue-database' failed")?;

    for schema in &schemas {
        info!(step = "glue-tables", table = %schema.table, "Creating Glue table");
        glue.create_table(&config.database_name, schema, &config.bucket_name)
            .await
            .with_context(|| {
                format!("Setup step 'glue-tables' failed for table '{}'", schema.table)
            })?;
    }

    info!("Setup complete");
    Ok(())
}
