//! AWS provider-spec payload.

use k8s_openapi::api::core::v1::LocalObjectReference;
use serde::{Deserialize, Serialize};

/// Placement tenancy values accepted by AWS.
pub const AWS_TENANCIES: [&str; 3] = ["default", "dedicated", "host"];

/// Configuration for a machine backed by an EC2 instance.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachineProviderConfig {
    /// Reference to the AMI the instance boots from.
    #[serde(default, skip_serializing_if = "AwsResourceReference::is_empty")]
    pub ami: AwsResourceReference,

    /// EC2 instance type, e.g. `m5.large`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_type: String,

    /// Tags applied to the instance. Duplicate names keep the first value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagSpecification>,

    /// IAM instance profile attached to the instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_instance_profile: Option<AwsResourceReference>,

    /// Secret carrying the ignition user data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret: Option<LocalObjectReference>,

    /// Secret carrying the cloud credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<LocalObjectReference>,

    /// Security groups attached to the instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<AwsResourceReference>,

    /// Subnet the instance is created in.
    #[serde(default, skip_serializing_if = "AwsResourceReference::is_empty")]
    pub subnet: AwsResourceReference,

    /// Region, availability zone and tenancy.
    #[serde(default, skip_serializing_if = "Placement::is_empty")]
    pub placement: Placement,
}

/// Reference to an AWS resource by ID, ARN, or filter set.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsResourceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl AwsResourceReference {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.arn.is_none() && self.filters.is_empty()
    }
}

/// Name/values filter used when referencing resources by query.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// A single instance tag.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSpecification {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// Instance placement constraints.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,

    /// One of `default`, `dedicated` or `host`; empty means `default`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenancy: String,
}

impl Placement {
    pub fn is_empty(&self) -> bool {
        self.region.is_empty() && self.availability_zone.is_empty() && self.tenancy.is_empty()
    }
}
