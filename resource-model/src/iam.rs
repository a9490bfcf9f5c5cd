//! IAM policy and role descriptors.
//!
//! Only the pieces needed to describe a service role with inline policies are
//! modelled here. Documents serialize with IAM's own field names so they can
//! be dropped straight into a template.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    #[serde(rename = "Resource")]
    pub resources: Vec<String>,
}

impl PolicyStatement {
    pub fn allow() -> Self {
        Self {
            effect: Effect::Allow,
            actions: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    #[serde(rename = "Statement")]
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statements,
        }
    }
}

/// An AWS service that may assume a role, e.g. `appconfig.amazonaws.com`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServicePrincipal(pub String);

impl ServicePrincipal {
    pub fn new(service: impl Into<String>) -> Self {
        Self(service.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trust policy letting only this service assume the role
    pub fn trust_policy(&self) -> serde_json::Value {
        serde_json::json!({
            "Version": POLICY_VERSION,
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": { "Service": self.0 },
                    "Action": "sts:AssumeRole"
                }
            ]
        })
    }
}

impl std::fmt::Display for ServicePrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declarative IAM role.
///
/// `role_name` is `None` when the physical name is left to the provisioning
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub assumed_by: ServicePrincipal,
    pub inline_policies: BTreeMap<String, PolicyDocument>,
    pub role_name: Option<String>,
}

impl RoleDescriptor {
    pub fn new(assumed_by: ServicePrincipal) -> Self {
        Self {
            assumed_by,
            inline_policies: BTreeMap::new(),
            role_name: None,
        }
    }

    pub fn with_inline_policy(mut self, name: impl Into<String>, document: PolicyDocument) -> Self {
        self.inline_policies.insert(name.into(), document);
        self
    }

    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }

    /// All statements across every inline policy
    pub fn statements(&self) -> impl Iterator<Item = &PolicyStatement> {
        self.inline_policies
            .values()
            .flat_map(|doc| doc.statements.iter())
    }

    /// CloudFormation `Properties` block for an `AWS::IAM::Role`
    pub fn to_properties(&self) -> serde_json::Value {
        let policies: Vec<serde_json::Value> = self
            .inline_policies
            .iter()
            .map(|(name, document)| {
                serde_json::json!({
                    "PolicyName": name,
                    "PolicyDocument": document,
                })
            })
            .collect();

        let mut properties = serde_json::json!({
            "AssumeRolePolicyDocument": self.assumed_by.trust_policy(),
            "Policies": policies,
        });
        if let Some(role_name) = &self.role_name {
            properties["RoleName"] = serde_json::Value::String(role_name.clone());
        }
        properties
    }
}
