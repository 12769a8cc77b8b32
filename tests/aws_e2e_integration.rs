//! End-to-end integration test - actually calls AWS APIs
//!
//! Runs the full setup sequence and then the full teardown sequence
//! (without the optional VPC endpoint, which needs a real VPC) and
//! verifies no resource is left behind. Marked `#[ignore]`:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_e2e_integration -- --ignored
//! ```

mod aws_test_helpers;

use aws_test_helpers::*;
use lakestack::aws::{AwsContext, GlueClient, IamClient, S3Client, VpcClient};
use lakestack::config::LakeConfig;
use lakestack::orchestrator::{run_setup, run_teardown, SetupOptions, TeardownOptions};

fn test_lake_config(run_id: &str) -> LakeConfig {
    LakeConfig {
        region: get_test_region(),
        bucket_name: format!("lakestack-{}", run_id),
        // The VPC endpoint steps stay disabled in this test, so these
        // ids are never sent to AWS.
        vpc_id: "vpc-00000000000000000".to_string(),
        route_table_id: "rtb-00000000000000000".to_string(),
        glue_role_name: format!("lakestack-{}-role", run_id),
        glue_role_policy_name: "lakestack-glue-access".to_string(),
        s3_role_policy_name: "lakestack-s3-access".to_string(),
        database_name: format!("lakestack_{}", run_id.replace('-', "_")),
    }
}

/// Write a minimal data tree and schema directory for the run.
fn test_fixtures() -> (tempfile::TempDir, tempfile::TempDir) {
    let data_dir = tempfile::tempdir().unwrap();
    let landing = data_dir.path().join("customer").join("landing");
    std::fs::create_dir_all(&landing).unwrap();
    std::fs::write(
        landing.join("customer-sample.json"),
        r#"{"customerName":"Test","serialNumber":"abc-123"}"#,
    )
    .unwrap();

    let schema_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        schema_dir.path().join("customer_landing.json"),
        r#"{
            "table": "customer_landing",
            "prefix": "customer/landing",
            "columns": [
                {"name": "customername", "type": "string"},
                {"name": "serialnumber", "type": "string"}
            ]
        }"#,
    )
    .unwrap();

    (data_dir, schema_dir)
}

/// Setup followed by teardown leaves no bucket, role, or database behind
#[tokio::test]
#[ignore]
async fn test_setup_teardown_round_trip() {
    let run_id = test_run_id();
    let config = test_lake_config(&run_id);
    let (data_dir, schema_dir) = test_fixtures();

    let aws = AwsContext::new(&config.region).await;
    let s3 = S3Client::from_context(&aws);
    let iam = IamClient::from_context(&aws);
    let glue = GlueClient::from_context(&aws);
    let vpc = VpcClient::from_context(&aws);

    run_setup(
        &config,
        data_dir.path(),
        schema_dir.path(),
        &SetupOptions::default(),
        &s3,
        &iam,
        &glue,
        &vpc,
    )
    .await
    .expect("Setup should succeed");

    assert!(s3.bucket_exists(&config.bucket_name).await.unwrap());
    assert!(iam.role_exists(&config.glue_role_name).await.unwrap());
    assert!(glue.database_exists(&config.database_name).await.unwrap());

    run_teardown(&config, &TeardownOptions::default(), &s3, &iam, &glue, &vpc)
        .await
        .expect("Teardown should succeed");

    assert!(!s3.bucket_exists(&config.bucket_name).await.unwrap());
    assert!(!iam.role_exists(&config.glue_role_name).await.unwrap());
    assert!(!glue.database_exists(&config.database_name).await.unwrap());
}

/// Teardown against an account with none of the resources present
/// completes without error
#[tokio::test]
#[ignore]
async fn test_teardown_of_absent_resources_succeeds() {
    let run_id = test_run_id();
    let config = test_lake_config(&run_id);

    let aws = AwsContext::new(&config.region).await;
    let s3 = S3Client::from_context(&aws);
    let iam = IamClient::from_context(&aws);
    let glue = GlueClient::from_context(&aws);
    let vpc = VpcClient::from_context(&aws);

    run_teardown(&config, &TeardownOptions::default(), &s3, &iam, &glue, &vpc)
        .await
        .expect("Teardown of absent resources should succeed");
}

/// Setup with the data-load skipped creates the bucket but no objects
#[tokio::test]
#[ignore]
async fn test_setup_skip_load_data_uploads_nothing() {
    let run_id = test_run_id();
    let config = test_lake_config(&run_id);
    let (data_dir, schema_dir) = test_fixtures();

    let aws = AwsContext::new(&config.region).await;
    let s3 = S3Client::from_context(&aws);
    let iam = IamClient::from_context(&aws);
    let glue = GlueClient::from_context(&aws);
    let vpc = VpcClient::from_context(&aws);

    run_setup(
        &config,
        data_dir.path(),
        schema_dir.path(),
        &SetupOptions {
            init_vpc_endpoint: false,
            skip_load_data: true,
        },
        &s3,
        &iam,
        &glue,
        &vpc,
    )
    .await
    .expect("Setup should succeed");

    // Emptying deletes zero objects because nothing was uploaded
    let deleted = s3.empty_bucket(&config.bucket_name).await.unwrap();
    assert_eq!(deleted, 0, "No objects should have been uploaded");

    run_teardown(&config, &TeardownOptions::default(), &s3, &iam, &glue, &vpc)
        .await
        .expect("Teardown should succeed");
}
