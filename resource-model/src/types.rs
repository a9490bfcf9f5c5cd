use crate::iam::RoleDescriptor;
use serde::{Deserialize, Serialize};

pub const ENVIRONMENT_RESOURCE_TYPE: &str = "AWS::AppConfig::Environment";
pub const ROLE_RESOURCE_TYPE: &str = "AWS::IAM::Role";

/// One alarm the service watches during a rollout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitorEntry {
    pub alarm_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_role_arn: Option<String>,
}

impl MonitorEntry {
    pub fn new(alarm_arn: impl Into<String>) -> Self {
        Self {
            alarm_arn: alarm_arn.into(),
            alarm_role_arn: None,
        }
    }

    pub fn with_alarm_role_arn(mut self, alarm_role_arn: impl Into<String>) -> Self {
        self.alarm_role_arn = Some(alarm_role_arn.into());
        self
    }
}

/// Properties of an `AWS::AppConfig::Environment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentDescriptor {
    pub application_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub monitors: Vec<MonitorEntry>,
}

impl EnvironmentDescriptor {
    pub fn new(application_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            name: name.into(),
            description: None,
            monitors: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_monitors(mut self, monitors: Vec<MonitorEntry>) -> Self {
        self.monitors = monitors;
        self
    }
}

/// A resource handed to the provisioning engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDefinition {
    Environment(EnvironmentDescriptor),
    Role(RoleDescriptor),
}

impl ResourceDefinition {
    pub fn resource_type(&self) -> &'static str {
        match self {
            ResourceDefinition::Environment(_) => ENVIRONMENT_RESOURCE_TYPE,
            ResourceDefinition::Role(_) => ROLE_RESOURCE_TYPE,
        }
    }

    /// Template fragment with `Type` and `Properties`
    pub fn to_template(&self) -> serde_json::Result<serde_json::Value> {
        let properties = match self {
            ResourceDefinition::Environment(descriptor) => serde_json::to_value(descriptor)?,
            ResourceDefinition::Role(role) => role.to_properties(),
        };
        Ok(serde_json::json!({
            "Type": self.resource_type(),
            "Properties": properties,
        }))
    }
}
