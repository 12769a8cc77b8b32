//! IAM role and inline policy management for the Glue service role

use crate::aws::context::AwsContext;
use crate::aws::error;
use crate::aws::tags::{format_created_at, TAG_CREATED_AT, TAG_TOOL, TAG_TOOL_VALUE};
use crate::retry::{notify_retry, retry_policy};
use crate::wait::{wait_for_resource, WaitConfig};
use anyhow::{Context, Result};
use aws_sdk_iam::Client;
use backon::Retryable;
use std::future::Future;
use tracing::{debug, info};

/// The trust policy allowing the Glue service to assume the role
const GLUE_ASSUME_ROLE_POLICY: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {
            "Effect": "Allow",
            "Principal": {
                "Service": "glue.amazonaws.com"
            },
            "Action": "sts:AssumeRole"
        }
    ]
}"#;

/// Inline policy granting list and object CRUD access to the lake bucket.
pub fn s3_access_policy(bucket_name: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "ListObjectsInBucket",
                "Effect": "Allow",
                "Action": ["s3:ListBucket"],
                "Resource": [format!("arn:aws:s3:::{}", bucket_name)]
            },
            {
                "Sid": "AllObjectActions",
                "Effect": "Allow",
                "Action": "s3:*Object",
                "Resource": [format!("arn:aws:s3:::{}/*", bucket_name)]
            }
        ]
    })
    .to_string()
}

/// Inline policy granting the general access the Glue service needs
/// (catalog operations, scratch buckets, logs, network interfaces).
pub fn glue_service_policy() -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Action": [
                    "glue:*",
                    "s3:GetBucketLocation",
                    "s3:ListBucket",
                    "s3:ListAllMyBuckets",
                    "s3:GetBucketAcl",
                    "ec2:DescribeVpcEndpoints",
                    "ec2:DescribeRouteTables",
                    "ec2:CreateNetworkInterface",
                    "ec2:DeleteNetworkInterface",
                    "ec2:DescribeNetworkInterfaces",
                    "ec2:DescribeSecurityGroups",
                    "ec2:DescribeSubnets",
                    "ec2:DescribeVpcAttribute",
                    "iam:ListRolePolicies",
                    "iam:GetRole",
                    "iam:GetRolePolicy",
                    "cloudwatch:PutMetricData"
                ],
                "Resource": ["*"]
            },
            {
                "Effect": "Allow",
                "Action": ["s3:CreateBucket", "s3:PutBucketPublicAccessBlock"],
                "Resource": ["arn:aws:s3:::aws-glue-*"]
            },
            {
                "Effect": "Allow",
                "Action": ["s3:GetObject", "s3:PutObject", "s3:DeleteObject"],
                "Resource": [
                    "arn:aws:s3:::aws-glue-*/*",
                    "arn:aws:s3:::*/*aws-glue-*/*"
                ]
            },
            {
                "Effect": "Allow",
                "Action": ["s3:GetObject"],
                "Resource": [
                    "arn:aws:s3:::crawler-public*",
                    "arn:aws:s3:::aws-glue-*"
                ]
            },
            {
                "Effect": "Allow",
                "Action": [
                    "logs:CreateLogGroup",
                    "logs:CreateLogStream",
                    "logs:PutLogEvents",
                    "logs:AssociateKmsKey"
                ],
                "Resource": ["arn:aws:logs:*:*:/aws-glue/*"]
            },
            {
                "Effect": "Allow",
                "Action": ["ec2:CreateTags", "ec2:DeleteTags"],
                "Condition": {
                    "ForAllValues:StringEquals": {
                        "aws:TagKeys": ["aws-glue-service-resource"]
                    }
                },
                "Resource": [
                    "arn:aws:ec2:*:*:network-interface/*",
                    "arn:aws:ec2:*:*:security-group/*",
                    "arn:aws:ec2:*:*:instance/*"
                ]
            }
        ]
    })
    .to_string()
}

/// IAM client for the Glue service role
pub struct IamClient {
    client: Client,
}

impl IamClient {
    /// Create a new IAM client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an IAM client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.iam_client(),
        }
    }

    /// Check whether the role exists.
    pub async fn role_exists(&self, role_name: &str) -> Result<bool> {
        match self.client.get_role().role_name(role_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_entity_exception() {
                    Ok(false)
                } else {
                    Err(service_err).context("Failed to check role existence")
                }
            }
        }
    }

    /// Create the Glue service role if it does not already exist.
    ///
    /// New roles carry the Glue trust policy and the standard lakestack
    /// tags, and the call only returns once the role is visible to
    /// reads. Calling this against an existing role is a no-op.
    pub async fn ensure_role_exists(&self, role_name: &str) -> Result<()> {
        if self.role_exists(role_name).await? {
            debug!(role_name = %role_name, "IAM role already exists");
            return Ok(());
        }

        info!(role_name = %role_name, "Creating IAM role for the Glue service");

        let tool_tag = aws_sdk_iam::types::Tag::builder()
            .key(TAG_TOOL)
            .value(TAG_TOOL_VALUE)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build IAM tag: {}", e))?;
        let created_tag = aws_sdk_iam::types::Tag::builder()
            .key(TAG_CREATED_AT)
            .value(format_created_at(chrono::Utc::now()))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build IAM tag: {}", e))?;

        let create_result = (|| {
            let tool_tag = tool_tag.clone();
            let created_tag = created_tag.clone();
            async move {
                self.client
                    .create_role()
                    .role_name(role_name)
                    .assume_role_policy_document(GLUE_ASSUME_ROLE_POLICY)
                    .description("IAM role assumed by AWS Glue to access the data lake resources")
                    .tags(tool_tag)
                    .tags(created_tag)
                    .send()
                    .await
            }
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("CreateRole"))
        .await;

        match create_result {
            Ok(_) => {}
            Err(e) if error::is_already_exists(&e) => {
                debug!(role_name = %role_name, "IAM role created concurrently");
            }
            Err(e) => return Err(e).context("Failed to create IAM role"),
        }

        // IAM is eventually consistent; wait until reads see the role
        // before policies are attached or Glue references it.
        wait_for_resource(
            WaitConfig::default(),
            || async move { self.role_exists(role_name).await },
            "IAM role",
        )
        .await
        .context("Waiting for IAM role to become visible")?;

        info!(role_name = %role_name, "IAM role created");
        Ok(())
    }

    /// Attach (or overwrite) a named inline policy on the role.
    ///
    /// PutRolePolicy replaces the document wholesale, so repeated calls
    /// are idempotent.
    pub async fn attach_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> Result<()> {
        (|| async move {
            self.client
                .put_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .policy_document(policy_document)
                .send()
                .await
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("PutRolePolicy"))
        .await
        .with_context(|| format!("Failed to attach inline policy '{}'", policy_name))?;

        info!(role_name = %role_name, policy_name = %policy_name, "Inline policy attached");
        Ok(())
    }

    /// Delete the role and every inline policy attached to it.
    ///
    /// IAM refuses to delete a role that still has inline policies, so
    /// those go first. A role that does not exist is treated as already
    /// deleted.
    pub async fn delete_role(&self, role_name: &str) -> Result<()> {
        info!(role_name = %role_name, "Deleting IAM role");

        let mut policy_names = Vec::new();
        let mut marker = None;
        loop {
            let mut request = self.client.list_role_policies().role_name(role_name);
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if error::is_not_found(&e) => {
                    debug!(role_name = %role_name, "IAM role already deleted");
                    return Ok(());
                }
                Err(e) => return Err(e).context("Failed to list inline policies"),
            };

            policy_names.extend(response.policy_names().iter().cloned());

            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        for policy_name in &policy_names {
            match self
                .client
                .delete_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .send()
                .await
            {
                Ok(_) => {
                    debug!(role_name = %role_name, policy_name = %policy_name, "Inline policy deleted");
                }
                Err(e) if error::is_not_found(&e) => {
                    debug!(policy_name = %policy_name, "Inline policy already deleted");
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to delete inline policy '{}'", policy_name)
                    })
                }
            }
        }

        // DeleteConflict (policy deletion still propagating) is
        // retryable here.
        let delete_result = (|| async move {
            self.client
                .delete_role()
                .role_name(role_name)
                .send()
                .await
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("DeleteRole"))
        .await;

        match delete_result {
            Ok(_) => {
                info!(role_name = %role_name, "IAM role deleted");
                Ok(())
            }
            Err(e) if error::is_not_found(&e) => {
                debug!(role_name = %role_name, "IAM role already deleted");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to delete IAM role"),
        }
    }
}

/// Trait for IAM operations, the seam the orchestrators run against.
pub trait IamOperations: Send + Sync {
    /// Create the Glue service role if absent; no-op otherwise.
    fn ensure_role_exists(&self, role_name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Attach (or overwrite) a named inline policy on the role.
    fn attach_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete the role and its inline policies, tolerating "not found".
    fn delete_role(&self, role_name: &str) -> impl Future<Output = Result<()>> + Send;
}

impl IamOperations for IamClient {
    async fn ensure_role_exists(&self, role_name: &str) -> Result<()> {
        IamClient::ensure_role_exists(self, role_name).await
    }

    async fn attach_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> Result<()> {
        IamClient::attach_inline_policy(self, role_name, policy_name, policy_document).await
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        IamClient::delete_role(self, role_name).await
    }
}
