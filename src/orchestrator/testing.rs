//! Recording fakes for orchestrator tests
//!
//! One struct implements every resource-family operations trait,
//! records each call in order, and optionally fails on a named
//! operation so abort behavior can be exercised.

use crate::aws::{GlueOperations, IamOperations, S3Operations, VpcOperations};
use crate::schema::TableSchema;
use anyhow::Result;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingClients {
    calls: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl RecordingClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake that fails with an injected error on the named operation.
    pub fn failing_on(op: &'static str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(op),
        }
    }

    fn record(&self, op: &str, detail: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{op}:{detail}"));
        if self.fail_on == Some(op) {
            anyhow::bail!("injected failure in {op}");
        }
        Ok(())
    }

    /// Full `op:detail` call log, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Operation names only, in call order.
    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.split(':').next().unwrap().to_string())
            .collect()
    }
}

impl S3Operations for RecordingClients {
    async fn ensure_bucket_exists(&self, bucket: &str) -> Result<()> {
        self.record("ensure_bucket", bucket)
    }

    async fn upload_sample_data(&self, bucket: &str, _data_dir: &Path) -> Result<usize> {
        self.record("upload_sample_data", bucket)?;
        Ok(3)
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<usize> {
        self.record("empty_bucket", bucket)?;
        Ok(0)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.record("delete_bucket", bucket)
    }
}

impl IamOperations for RecordingClients {
    async fn ensure_role_exists(&self, role_name: &str) -> Result<()> {
        self.record("ensure_role", role_name)
    }

    async fn attach_inline_policy(
        &self,
        _role_name: &str,
        policy_name: &str,
        _policy_document: &str,
    ) -> Result<()> {
        self.record("attach_policy", policy_name)
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        self.record("delete_role", role_name)
    }
}

impl GlueOperations for RecordingClients {
    async fn ensure_database_exists(&self, database_name: &str) -> Result<()> {
        self.record("ensure_database", database_name)
    }

    async fn create_table(
        &self,
        _database_name: &str,
        schema: &TableSchema,
        _bucket: &str,
    ) -> Result<()> {
        self.record("create_table", &schema.table)
    }

    async fn delete_database(&self, database_name: &str) -> Result<()> {
        self.record("delete_database", database_name)
    }
}

impl VpcOperations for RecordingClients {
    async fn create_endpoint(
        &self,
        vpc_id: &str,
        _route_table_id: &str,
        _service_name: &str,
    ) -> Result<String> {
        self.record("create_endpoint", vpc_id)?;
        Ok("vpce-00000000000000000".to_string())
    }

    async fn delete_endpoint(&self, vpc_id: &str, _service_name: &str) -> Result<usize> {
        self.record("delete_endpoint", vpc_id)?;
        Ok(1)
    }
}

/// Config fixture shared by the orchestrator tests.
pub fn test_config() -> crate::config::LakeConfig {
    crate::config::LakeConfig {
        region: "us-west-2".to_string(),
        bucket_name: "test-lake-bucket".to_string(),
        vpc_id: "vpc-0abc123def456ghij".to_string(),
        route_table_id: "rtb-0123456789abcdef0".to_string(),
        glue_role_name: "test-glue-role".to_string(),
        glue_role_policy_name: "test-glue-policy".to_string(),
        s3_role_policy_name: "test-s3-policy".to_string(),
        database_name: "test_db".to_string(),
    }
}

/// Write `n` minimal schema files into a fresh temp directory.
pub fn test_schema_dir(tables: &[&str]) -> tempfile::TempDir {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    for (i, table) in tables.iter().enumerate() {
        let path = dir.path().join(format!("{i:02}_{table}.json"));
        let mut file = std::fs::File::create(path).unwrap();
        write!(
            file,
            r#"{{"table": "{table}", "prefix": "{table}/landing", "columns": [{{"name": "id", "type": "string"}}]}}"#
        )
        .unwrap();
    }
    dir
}
