//! Configuration for a lakestack run
//!
//! Loaded once from an INI file at startup and read-only afterwards.
//! Sections and key names mirror the config file shipped with the
//! project (`lake.cfg`).

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("missing section [{0}] in config file")]
    MissingSection(&'static str),

    #[error("missing key {key} in section [{section}]")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },
}

/// Static configuration for the data lake resources
///
/// Every field identifies a resource by name/id; none of them change for
/// the lifetime of the process.
#[derive(Debug, Clone)]
pub struct LakeConfig {
    /// AWS region all resources live in
    pub region: String,
    /// Name of the data lake S3 bucket
    pub bucket_name: String,
    /// VPC to place the optional S3 gateway endpoint in
    pub vpc_id: String,
    /// Route table the gateway endpoint is associated with
    pub route_table_id: String,
    /// Name of the IAM role assumed by the Glue service
    pub glue_role_name: String,
    /// Name of the inline policy granting Glue general access
    pub glue_role_policy_name: String,
    /// Name of the inline policy granting S3 access to the bucket
    pub s3_role_policy_name: String,
    /// Name of the Glue catalog database
    pub database_name: String,
}

impl LakeConfig {
    /// Load the configuration from an INI file.
    ///
    /// Fails fast if the file cannot be read or any required key is
    /// absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        Ok(Self {
            region: get(ini, "AWS", "REGION")?,
            bucket_name: get(ini, "S3", "S3_BUCKET_NAME")?,
            vpc_id: get(ini, "EC2", "VPC_ID")?,
            route_table_id: get(ini, "EC2", "ROUTE_TABLE_ID")?,
            glue_role_name: get(ini, "IAM", "GLUE_ROLE_NAME")?,
            glue_role_policy_name: get(ini, "IAM", "GLUE_ROLE_POLICY_NAME")?,
            s3_role_policy_name: get(ini, "IAM", "S3_ROLE_POLICY_NAME")?,
            database_name: get(ini, "GLUE", "DB_NAME")?,
        })
    }
}

fn get(ini: &Ini, section: &'static str, key: &'static str) -> Result<String, ConfigError> {
    let props = ini
        .section(Some(section))
        .ok_or(ConfigError::MissingSection(section))?;

    props
        .get(key)
        .map(|v| v.to_string())
        .ok_or(ConfigError::MissingKey { section, key })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = "\
[AWS]
REGION = us-west-2

[S3]
S3_BUCKET_NAME = stedi-lake-house

[EC2]
VPC_ID = vpc-0abc123def456ghij
ROUTE_TABLE_ID = rtb-0123456789abcdef0

[IAM]
GLUE_ROLE_NAME = lakestack-glue-service-role
GLUE_ROLE_POLICY_NAME = lakestack-glue-access
S3_ROLE_POLICY_NAME = lakestack-s3-access

[GLUE]
DB_NAME = stedi
";

    #[test]
    fn loads_all_fields() {
        let ini = Ini::load_from_str(FULL_CONFIG).unwrap();
        let config = LakeConfig::from_ini(&ini).unwrap();

        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.bucket_name, "stedi-lake-house");
        assert_eq!(config.vpc_id, "vpc-0abc123def456ghij");
        assert_eq!(config.route_table_id, "rtb-0123456789abcdef0");
        assert_eq!(config.glue_role_name, "lakestack-glue-service-role");
        assert_eq!(config.glue_role_policy_name, "lakestack-glue-access");
        assert_eq!(config.s3_role_policy_name, "lakestack-s3-access");
        assert_eq!(config.database_name, "stedi");
    }

    #[test]
    fn missing_key_fails() {
        let without_db = FULL_CONFIG.replace("DB_NAME = stedi", "");
        let ini = Ini::load_from_str(&without_db).unwrap();
        let err = LakeConfig::from_ini(&ini).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::MissingKey {
                section: "GLUE",
                key: "DB_NAME"
            }
        ));
    }

    #[test]
    fn missing_section_fails() {
        let ini = Ini::load_from_str("[AWS]\nREGION = us-west-2\n").unwrap();
        let err = LakeConfig::from_ini(&ini).unwrap_err();

        assert!(matches!(err, ConfigError::MissingSection("S3")));
    }

    #[test]
    fn missing_file_fails() {
        let err = LakeConfig::load(Path::new("/nonexistent/lake.cfg")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
