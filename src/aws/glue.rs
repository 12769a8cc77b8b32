//! Glue catalog database and table management

use crate::aws::context::AwsContext;
use crate::aws::error;
use crate::retry::{notify_retry, retry_policy};
use crate::schema::TableSchema;
use crate::wait::{wait_for_resource, WaitConfig};
use anyhow::{Context, Result};
use aws_sdk_glue::types::{Column, DatabaseInput, SerDeInfo, StorageDescriptor, TableInput};
use aws_sdk_glue::Client;
use backon::Retryable;
use std::future::Future;
use tracing::{debug, info};

/// Glue client for the data lake catalog
pub struct GlueClient {
    client: Client,
}

impl GlueClient {
    /// Create a new Glue client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create a Glue client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.glue_client(),
        }
    }

    /// Check whether the database exists.
    pub async fn database_exists(&self, database_name: &str) -> Result<bool> {
        match self
            .client
            .get_database()
            .name(database_name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_entity_not_found_exception() {
                    Ok(false)
                } else {
                    Err(service_err).context("Failed to check database existence")
                }
            }
        }
    }

    /// Create the database if it does not already exist.
    ///
    /// Glue has no `database_created` waiter, so after creating we poll
    /// GetDatabase until the database is readable. Calling this against
    /// an existing database is a no-op.
    pub async fn ensure_database_exists(&self, database_name: &str) -> Result<()> {
        if self.database_exists(database_name).await? {
            debug!(database = %database_name, "Glue database already exists");
            return Ok(());
        }

        info!(database = %database_name, "Creating Glue database");

        let database_input = DatabaseInput::builder()
            .name(database_name)
            .description("Data lake catalog database managed by lakestack")
            .parameters("created_by", "lakestack")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build database input: {}", e))?;

        let create_result = (|| {
            let database_input = database_input.clone();
            async move {
                self.client
                    .create_database()
                    .database_input(database_input)
                    .send()
                    .await
            }
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("CreateDatabase"))
        .await;

        match create_result {
            Ok(_) => {}
            Err(e) if error::is_already_exists(&e) => {
                debug!(database = %database_name, "Glue database created concurrently");
            }
            Err(e) => return Err(e).context("Failed to create Glue database"),
        }

        wait_for_resource(
            WaitConfig::default(),
            || async move { self.database_exists(database_name).await },
            "Glue database",
        )
        .await
        .context("Waiting for Glue database to become available")?;

        info!(database = %database_name, "Glue database created");
        Ok(())
    }

    /// Create a table in the database from a schema description.
    ///
    /// The schema's columns flow into the table definition verbatim and
    /// the storage location points at the table's bucket prefix. An
    /// existing table with the same name is overwritten via UpdateTable.
    pub async fn create_table(
        &self,
        database_name: &str,
        schema: &TableSchema,
        bucket: &str,
    ) -> Result<()> {
        let location = schema.storage_location(bucket);
        info!(
            database = %database_name,
            table = %schema.table,
            location = %location,
            "Creating Glue table"
        );

        let table_input = build_table_input(schema, &location)?;

        let create_result = (|| {
            let table_input = table_input.clone();
            async move {
                self.client
                    .create_table()
                    .database_name(database_name)
                    .table_input(table_input)
                    .send()
                    .await
            }
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("CreateTable"))
        .await;

        match create_result {
            Ok(_) => {
                info!(database = %database_name, table = %schema.table, "Glue table created");
                Ok(())
            }
            Err(e) if error::is_already_exists(&e) => {
                debug!(table = %schema.table, "Glue table exists, overwriting definition");
                self.client
                    .update_table()
                    .database_name(database_name)
                    .table_input(table_input.clone())
                    .send()
                    .await
                    .context("Failed to overwrite existing Glue table")?;
                info!(database = %database_name, table = %schema.table, "Glue table overwritten");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to create Glue table"),
        }
    }

    /// Delete the database.
    ///
    /// Glue cascades the deletion to the database's tables. A database
    /// that does not exist is treated as already deleted.
    pub async fn delete_database(&self, database_name: &str) -> Result<()> {
        info!(database = %database_name, "Deleting Glue database");

        let delete_result = (|| async move {
            self.client
                .delete_database()
                .name(database_name)
                .send()
                .await
        })
        .retry(retry_policy())
        .when(error::is_transient)
        .notify(notify_retry("DeleteDatabase"))
        .await;

        match delete_result {
            Ok(_) => {
                info!(database = %database_name, "Glue database deleted");
                Ok(())
            }
            Err(e) if error::is_not_found(&e) => {
                debug!(database = %database_name, "Glue database already deleted");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to delete Glue database"),
        }
    }
}

/// Build the Glue TableInput for a schema description.
fn build_table_input(schema: &TableSchema, location: &str) -> Result<TableInput> {
    let columns = schema
        .columns
        .iter()
        .map(|c| {
            Column::builder()
                .name(&c.name)
                .r#type(&c.data_type)
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build column '{}': {}", c.name, e))
        })
        .collect::<Result<Vec<_>>>()?;

    let serde_info = SerDeInfo::builder()
        .serialization_library(&schema.serde_library)
        .parameters("classification", &schema.classification)
        .build();

    let storage = StorageDescriptor::builder()
        .set_columns(Some(columns))
        .location(location)
        .input_format(&schema.input_format)
        .output_format(&schema.output_format)
        .serde_info(serde_info)
        .build();

    TableInput::builder()
        .name(&schema.table)
        .storage_descriptor(storage)
        .table_type("EXTERNAL_TABLE")
        .parameters("classification", &schema.classification)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build table input: {}", e))
}

/// Trait for Glue operations, the seam the orchestrators run against.
pub trait GlueOperations: Send + Sync {
    /// Create the database if absent; no-op otherwise.
    fn ensure_database_exists(
        &self,
        database_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Create (or overwrite) a table from a schema description.
    fn create_table(
        &self,
        database_name: &str,
        schema: &TableSchema,
        bucket: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete the database and its tables, tolerating "not found".
    fn delete_database(&self, database_name: &str) -> impl Future<Output = Result<()>> + Send;
}

impl GlueOperations for GlueClient {
    async fn ensure_database_exists(&self, database_name: &str) -> Result<()> {
        GlueClient::ensure_database_exists(self, database_name).await
    }

    async fn create_table(
        &self,
        database_name: &str,
        schema: &TableSchema,
        bucket: &str,
    ) -> Result<()> {
        GlueClient::create_table(self, database_name, schema, bucket).await
    }

    async fn delete_database(&self, database_name: &str) -> Result<()> {
        GlueClient::delete_database(self, database_name).await
    }
}
