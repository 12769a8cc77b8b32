//! lakestack: provision and tear down the AWS data lake resources
//!
//! Creates (or deletes) the S3 bucket, Glue service role, optional S3
//! gateway VPC endpoint, and Glue database/tables for the data lake
//! exercise, driven by an INI config file and a directory of table
//! schema JSON files.

use anyhow::Result;
use clap::Parser;
use lakestack::aws::{
    get_current_account_id, AwsContext, GlueClient, IamClient, S3Client, VpcClient,
};
use lakestack::config::LakeConfig;
use lakestack::orchestrator::{run_setup, run_teardown, SetupOptions, TeardownOptions};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lakestack")]
#[command(about = "Provision and tear down the AWS resources backing the data lake")]
#[command(version)]
#[command(group(
    clap::ArgGroup::new("action")
        .required(true)
        .args(["setup", "teardown"])
))]
struct Args {
    /// Run the setup sequence, creating the data lake resources
    #[arg(long)]
    setup: bool,

    /// Run the teardown sequence, deleting the data lake resources
    #[arg(long)]
    teardown: bool,

    /// Create the S3 gateway VPC endpoint during setup
    #[arg(long)]
    init_vpc_endpoint: bool,

    /// Delete the S3 gateway VPC endpoint during teardown
    #[arg(long)]
    remove_vpc_endpoint: bool,

    /// Skip the sample data upload during setup
    #[arg(long)]
    skip_load_data: bool,

    /// Leave the bucket and its objects in place during teardown
    #[arg(long)]
    skip_bucket_removal: bool,

    /// Path to the INI configuration file
    #[arg(long, default_value = "lake.cfg")]
    config: PathBuf,

    /// Directory holding sample data, one subdirectory per data source
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory holding the table schema JSON files
    #[arg(long, default_value = "schemas")]
    schema_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = LakeConfig::load(&args.config)?;
    info!(
        region = %config.region,
        bucket = %config.bucket_name,
        database = %config.database_name,
        "Configuration loaded"
    );

    let aws = AwsContext::new(&config.region).await;
    get_current_account_id(aws.sdk_config()).await?;

    let s3 = S3Client::from_context(&aws);
    let iam = IamClient::from_context(&aws);
    let glue = GlueClient::from_context(&aws);
    let vpc = VpcClient::from_context(&aws);

    if args.setup {
        info!("Running setup");
        let options = SetupOptions {
            init_vpc_endpoint: args.init_vpc_endpoint,
            skip_load_data: args.skip_load_data,
        };
        run_setup(
            &config,
            &args.data_dir,
            &args.schema_dir,
            &options,
            &s3,
            &iam,
            &glue,
            &vpc,
        )
        .await?;
    } else {
        info!("Running teardown");
        let options = TeardownOptions {
            remove_vpc_endpoint: args.remove_vpc_endpoint,
            skip_bucket_removal: args.skip_bucket_removal,
        };
        run_teardown(&config, &options, &s3, &iam, &glue, &vpc).await?;
    }

    Ok(())
}
