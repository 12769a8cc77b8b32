//! S3 gateway VPC endpoint management
//!
//! The endpoint is optional and discovered at teardown time by VPC,
//! service name, and the lakestack tool tag, so no endpoint id has to
//! survive between the setup and teardown runs.

use crate::aws::context::AwsContext;
use crate::aws::error;
use crate::aws::tags::{ec2_tag_spec, TAG_TOOL, TAG_TOOL_VALUE};
use crate::retry::{notify_retry, retry_policy};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Filter, ResourceType, VpcEndpoint, VpcEndpointType};
use aws_sdk_ec2::Client;
use backon::Retryable;
use std::future::Future;
use tracing::{debug, info, warn};

/// The S3 gateway service name for a region
pub fn s3_service_name(region: &str) -> String {
    format!("com.amazonaws.{}.s3", region)
}

/// EC2 client scoped to VPC endpoint operations
pub struct VpcClient {
    client: Client,
}

impl VpcClient {
    /// Create a new VPC client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create a VPC client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Find live endpoints for a service in a VPC.
    ///
    /// When `tagged_only` is set, only endpoints carrying the lakestack
    /// tool tag are returned (the teardown path never touches endpoints
    /// it did not create).
    async fn find_endpoints(
        &self,
        vpc_id: &str,
        service_name: &str,
        tagged_only: bool,
    ) -> Result<Vec<VpcEndpoint>> {
        let mut request = self
            .client
            .describe_vpc_endpoints()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(
                Filter::builder()
                    .name("service-name")
                    .values(service_name)
                    .build(),
            );

        if tagged_only {
            request = request.filters(
                Filter::builder()
                    .name(format!("tag:{}", TAG_TOOL))
                    .values(TAG_TOOL_VALUE)
                    .build(),
            );
        }

        let response = request
            .send()
            .await
            .context("Failed to describe VPC endpoints")?;

        let endpoints = response
            .vpc_endpoints()
            .iter()
            .filter(|ep| {
                let gone = ep
                    .state()
                    .map(|state| {
                        let s = state.as_str();
                        s.eq_ignore_ascii_case("deleted") || s.eq_ignore_ascii_case("deleting")
                    })
                    .unwrap_or(false);
                !gone
            })
            .cloned()
            .collect();

        Ok(endpoints)
    }

    /// Create an S3 gateway endpoint associated with the route table.
    ///
    /// If a live endpoint for the same service already exists in the
    /// VPC it is reused instead of creating a duplicate. Returns the
    /// endpoint id.
    pub async fn create_endpoint(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        service_name: &str,
    ) -> Result<String> {
        if let Some(existing) = self
            .find_endpoints(vpc_id, service_name, false)
            .await?
            .into_iter()
            .next()
        {
            let endpoint_id = existing
                .vpc_endpoint_id()
                .context("Existing VPC endpoint has no id")?
                .to_string();
            debug!(
                endpoint_id = %endpoint_id,
                vpc_id = %vpc_id,
                "VPC endpoint already exists, reusing"
            );
            return Ok(endpoint_id);
        }

        info!(
            vpc_id = %vpc_id,
            route_table_id = %route_table_id,
            service = %service_name,
            "Creating S3 gateway VPC endpoint"
        );

        let response = (|| async move {
            self.client
                .create_vpc_endpoint()
                .vpc_endpoint_type(VpcEndpointType::Gateway)
                .vpc_id(vpc_id)
                .service_name(service_name)
                .route_table_ids(route_table_id)
                .tag_specifications(ec2_tag_spec(ResourceType::VpcEndpoint))
                .send()
                .await
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("CreateVpcEndpoint"))
        .await
        .context("Failed to create VPC endpoint")?;

        let endpoint_id = response
            .vpc_endpoint()
            .and_then(|ep| ep.vpc_endpoint_id())
            .context("CreateVpcEndpoint returned no endpoint id")?
            .to_string();

        info!(endpoint_id = %endpoint_id, "VPC endpoint created");
        Ok(endpoint_id)
    }

    /// Delete the lakestack-tagged endpoint(s) for a service in a VPC.
    ///
    /// Zero matches is success: the endpoint is optional and teardown
    /// must tolerate it never having been created. Returns the number
    /// of endpoints deleted.
    pub async fn delete_endpoint(&self, vpc_id: &str, service_name: &str) -> Result<usize> {
        let endpoints = self.find_endpoints(vpc_id, service_name, true).await?;

        let endpoint_ids: Vec<String> = endpoints
            .iter()
            .filter_map(|ep| ep.vpc_endpoint_id().map(|id| id.to_string()))
            .collect();

        if endpoint_ids.is_empty() {
            debug!(vpc_id = %vpc_id, "No lakestack VPC endpoints to delete");
            return Ok(0);
        }

        info!(endpoint_ids = ?endpoint_ids, "Deleting VPC endpoints");

        let response = (|| {
            let ids = endpoint_ids.clone();
            async move {
                self.client
                    .delete_vpc_endpoints()
                    .set_vpc_endpoint_ids(Some(ids))
                    .send()
                    .await
            }
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("DeleteVpcEndpoints"))
        .await
        .context("Failed to delete VPC endpoints")?;

        let mut deleted = endpoint_ids.len();
        for item in response.unsuccessful() {
            let code = item.error().and_then(|e| e.code());
            if code.is_some_and(|c| error::classify_aws_error(Some(c), None).is_not_found()) {
                debug!(endpoint_id = ?item.resource_id(), "VPC endpoint already deleted");
                continue;
            }

            deleted = deleted.saturating_sub(1);
            warn!(
                endpoint_id = ?item.resource_id(),
                code = ?code,
                message = ?item.error().and_then(|e| e.message()),
                "Failed to delete VPC endpoint"
            );
        }

        if deleted < endpoint_ids.len() {
            anyhow::bail!(
                "Failed to delete {} of {} VPC endpoints",
                endpoint_ids.len() - deleted,
                endpoint_ids.len()
            );
        }

        Ok(deleted)
    }
}

/// Trait for VPC endpoint operations, the seam the orchestrators run against.
pub trait VpcOperations: Send + Sync {
    /// Create (or reuse) the S3 gateway endpoint; returns its id.
    fn create_endpoint(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        service_name: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Delete the tool-tagged endpoint(s); zero matches is success.
    fn delete_endpoint(
        &self,
        vpc_id: &str,
        service_name: &str,
    ) -> impl Future<Output = Result<usize>> + Send;
}

impl VpcOperations for VpcClient {
    async fn create_endpoint(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        service_name: &str,
    ) -> Result<String> {
        VpcClient::create_endpoint(self, vpc_id, route_table_id, service_name).await
    }

    async fn delete_endpoint(&self, vpc_id: &str, service_name: &str) -> Result<usize> {
        VpcClient::delete_endpoint(self, vpc_id, service_name).await
    }
}
