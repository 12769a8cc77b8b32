//! AWS resource tag constants
//!
//! Every resource lakestack creates is tagged so operators (and the
//! teardown path for VPC endpoints) can identify tool-managed resources
//! without local state.
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `lakestack:tool` | Static identifier ("lakestack") |
//! | `lakestack:created-at` | RFC 3339 creation timestamp |

/// Tag key for tool identification - all lakestack resources have this
pub const TAG_TOOL: &str = "lakestack:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "lakestack";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "lakestack:created-at";

/// Helper to format creation timestamp for tags
pub fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

/// Build an EC2 TagSpecification carrying the standard lakestack tags.
pub fn ec2_tag_spec(
    resource_type: aws_sdk_ec2::types::ResourceType,
) -> aws_sdk_ec2::types::TagSpecification {
    use aws_sdk_ec2::types::{Tag, TagSpecification};

    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key(TAG_TOOL).value(TAG_TOOL_VALUE).build())
        .tags(
            Tag::builder()
                .key(TAG_CREATED_AT)
                .value(format_created_at(chrono::Utc::now()))
                .build(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn created_at_is_rfc3339() {
        let now = Utc::now();
        let formatted = format_created_at(now);
        let parsed = chrono::DateTime::parse_from_rfc3339(&formatted).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), now);
    }

    #[test]
    fn ec2_tag_spec_carries_tool_tag() {
        let spec = ec2_tag_spec(aws_sdk_ec2::types::ResourceType::VpcEndpoint);
        let keys: Vec<_> = spec.tags().iter().filter_map(|t| t.key()).collect();
        assert!(keys.contains(&TAG_TOOL));
        assert!(keys.contains(&TAG_CREATED_AT));
    }
}
