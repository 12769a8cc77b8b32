//! S3 bucket and sample data management

use crate::aws::context::AwsContext;
use crate::aws::error;
use crate::aws::tags::{format_created_at, TAG_CREATED_AT, TAG_TOOL, TAG_TOOL_VALUE};
use crate::retry::{notify_retry, retry_policy};
use crate::wait::{wait_for_resource, WaitConfig};
use anyhow::{Context, Result};
use aws_sdk_s3::{primitives::ByteStream, Client};
use backon::Retryable;
use std::future::Future;
use std::path::Path;
use tracing::{debug, info};

/// S3 client for the data lake bucket
pub struct S3Client {
    client: Client,
    region: String,
}

impl S3Client {
    /// Create a new S3 client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an S3 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
            region: ctx.region().to_string(),
        }
    }

    /// Check whether the bucket exists and is owned by us.
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(service_err).context("Failed to check bucket existence")
                }
            }
        }
    }

    /// Create the bucket if it does not already exist.
    ///
    /// New buckets get a public-access block and the standard lakestack
    /// tags, and the call only returns once the bucket is visible to
    /// reads. Calling this against an existing bucket is a no-op.
    pub async fn ensure_bucket_exists(&self, bucket: &str) -> Result<()> {
        if self.bucket_exists(bucket).await? {
            debug!(bucket = %bucket, "Bucket already exists");
            return Ok(());
        }

        info!(bucket = %bucket, region = %self.region, "Creating S3 bucket");

        // us-east-1 is the default location and rejects an explicit
        // location constraint.
        let create_config = if self.region == "us-east-1" {
            None
        } else {
            let location_constraint =
                aws_sdk_s3::types::BucketLocationConstraint::from(self.region.as_str());
            Some(
                aws_sdk_s3::types::CreateBucketConfiguration::builder()
                    .location_constraint(location_constraint)
                    .build(),
            )
        };

        let create_result = (|| {
            let create_config = create_config.clone();
            async move {
                self.client
                    .create_bucket()
                    .bucket(bucket)
                    .set_create_bucket_configuration(create_config)
                    .send()
                    .await
            }
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("CreateBucket"))
        .await;

        match create_result {
            Ok(_) => {}
            Err(e) if error::is_already_exists(&e) => {
                debug!(bucket = %bucket, "Bucket already owned by us");
            }
            Err(e) => return Err(e).context("Failed to create bucket"),
        }

        self.apply_access_block(bucket).await?;
        self.tag_bucket(bucket).await?;

        // S3 bucket creation is eventually consistent; wait until reads
        // see the bucket before dependent steps run.
        wait_for_resource(
            WaitConfig::default(),
            || async move { self.bucket_exists(bucket).await },
            "S3 bucket",
        )
        .await
        .context("Waiting for S3 bucket to become visible")?;

        info!(bucket = %bucket, "S3 bucket created");
        Ok(())
    }

    /// Block all public access to the bucket.
    async fn apply_access_block(&self, bucket: &str) -> Result<()> {
        let block_config = aws_sdk_s3::types::PublicAccessBlockConfiguration::builder()
            .block_public_acls(true)
            .ignore_public_acls(true)
            .block_public_policy(true)
            .restrict_public_buckets(true)
            .build();

        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(block_config)
            .send()
            .await
            .context("Failed to apply public access block")?;

        debug!(bucket = %bucket, "Public access block applied");
        Ok(())
    }

    /// Apply the standard lakestack tags to the bucket.
    async fn tag_bucket(&self, bucket: &str) -> Result<()> {
        use aws_sdk_s3::types::{Tag, Tagging};

        let tagging = Tagging::builder()
            .tag_set(
                Tag::builder()
                    .key(TAG_TOOL)
                    .value(TAG_TOOL_VALUE)
                    .build()
                    .map_err(|e| anyhow::anyhow!("Failed to build bucket tag: {}", e))?,
            )
            .tag_set(
                Tag::builder()
                    .key(TAG_CREATED_AT)
                    .value(format_created_at(chrono::Utc::now()))
                    .build()
                    .map_err(|e| anyhow::anyhow!("Failed to build bucket tag: {}", e))?,
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build bucket tagging: {}", e))?;

        self.client
            .put_bucket_tagging()
            .bucket(bucket)
            .tagging(tagging)
            .send()
            .await
            .context("Failed to tag bucket")?;

        Ok(())
    }

    /// Upload a single file to S3.
    pub async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        debug!(bucket = %bucket, key = %key, path = %path.display(), "Uploading file");

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .context("Failed to upload file")?;

        Ok(())
    }

    /// Upload every file under `{data_dir}/{source}/landing/` to the key
    /// `{source}/landing/{file}`.
    ///
    /// Existing objects with the same key are overwritten. Sources with
    /// no `landing/` directory are skipped. Returns the number of
    /// objects uploaded.
    pub async fn upload_sample_data(&self, bucket: &str, data_dir: &Path) -> Result<usize> {
        let sources = std::fs::read_dir(data_dir)
            .with_context(|| format!("Data directory not found at {}", data_dir.display()))?;

        let mut uploaded = 0usize;
        for source in sources {
            let source = source.context("Failed to read data directory entry")?;
            if !source.path().is_dir() {
                continue;
            }

            let source_name = source.file_name().to_string_lossy().to_string();
            let landing_dir = source.path().join("landing");
            if !landing_dir.is_dir() {
                info!(source = %source_name, "Skipping: no landing/ directory found");
                continue;
            }

            let files = std::fs::read_dir(&landing_dir).with_context(|| {
                format!("Failed to list landing directory {}", landing_dir.display())
            })?;

            for file in files {
                let file = file.context("Failed to read landing directory entry")?;
                let path = file.path();
                if !path.is_file() {
                    continue;
                }

                let key = format!(
                    "{}/landing/{}",
                    source_name,
                    file.file_name().to_string_lossy()
                );
                self.upload_file(bucket, &key, &path).await?;
                info!(
                    path = %path.display(),
                    destination = %format!("s3://{}/{}", bucket, key),
                    "Uploaded sample file"
                );
                uploaded += 1;
            }
        }

        Ok(uploaded)
    }

    /// Delete every object in the bucket.
    ///
    /// A missing bucket counts as already empty. Returns the number of
    /// objects deleted.
    pub async fn empty_bucket(&self, bucket: &str) -> Result<usize> {
        info!(bucket = %bucket, "Emptying bucket");

        let mut deleted = 0usize;
        let mut continuation_token = None;
        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if error::is_not_found(&e) => {
                    debug!(bucket = %bucket, "Bucket does not exist, nothing to empty");
                    return Ok(0);
                }
                Err(e) => return Err(e).context("Failed to list objects"),
            };

            for object in response.contents() {
                if let Some(key) = object.key() {
                    debug!(key = %key, "Deleting object");
                    self.client
                        .delete_object()
                        .bucket(bucket)
                        .key(key)
                        .send()
                        .await
                        .context("Failed to delete object")?;
                    deleted += 1;
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(deleted)
    }

    /// Empty and delete the bucket.
    ///
    /// A bucket that does not exist is treated as already deleted.
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let deleted = self.empty_bucket(bucket).await?;
        debug!(bucket = %bucket, objects = deleted, "Bucket emptied");

        let delete_result =
            (|| async move { self.client.delete_bucket().bucket(bucket).send().await })
                .retry(retry_policy())
                .when(error::is_transient)
                .notify(notify_retry("DeleteBucket"))
                .await;

        match delete_result {
            Ok(_) => {
                info!(bucket = %bucket, "Bucket deleted");
                Ok(())
            }
            Err(e) if error::is_not_found(&e) => {
                debug!(bucket = %bucket, "Bucket already deleted");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to delete bucket"),
        }
    }
}

/// Trait for S3 operations, the seam the orchestrators run against.
pub trait S3Operations: Send + Sync {
    /// Create the bucket if absent; no-op otherwise.
    fn ensure_bucket_exists(&self, bucket: &str) -> impl Future<Output = Result<()>> + Send;

    /// Upload the local sample data tree into the bucket.
    fn upload_sample_data(
        &self,
        bucket: &str,
        data_dir: &Path,
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Delete every object in the bucket.
    fn empty_bucket(&self, bucket: &str) -> impl Future<Output = Result<usize>> + Send;

    /// Empty and delete the bucket, tolerating "not found".
    fn delete_bucket(&self, bucket: &str) -> impl Future<Output = Result<()>> + Send;
}

impl S3Operations for S3Client {
    async fn ensure_bucket_exists(&self, bucket: &str) -> Result<()> {
        S3Client::ensure_bucket_exists(self, bucket).await
    }

    async fn upload_sample_data(&self, bucket: &str, data_dir: &Path) -> Result<usize> {
        S3Client::upload_sample_data(self, bucket, data_dir).await
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<usize> {
        S3Client::empty_bucket(self, bucket).await
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        S3Client::delete_bucket(self, bucket).await
    }
}
