use crate::arn::{ArnComponents, ArnFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Deployment context is missing the {field}")]
    MissingContext { field: &'static str },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Partition, account and region a stack deploys into.
///
/// Every ARN formatted for a construct in the stack is resolved against this
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentEnv {
    pub partition: String,
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Default for DeploymentEnv {
    fn default() -> Self {
        Self {
            partition: "aws".to_string(),
            account: None,
            region: None,
        }
    }
}

impl DeploymentEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.partition.is_empty() {
            return Err(ConfigError::Invalid {
                field: "partition",
                reason: "Partition cannot be empty".to_string(),
            });
        }

        if let Some(account) = &self.account {
            if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::Invalid {
                    field: "account",
                    reason: format!("Account must be 12 digits, got '{}'", account),
                });
            }
        }

        if let Some(region) = &self.region {
            let well_formed = !region.is_empty()
                && !region.starts_with('-')
                && !region.ends_with('-')
                && region
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
            if !well_formed {
                return Err(ConfigError::Invalid {
                    field: "region",
                    reason: format!("Region '{}' is not a valid region code", region),
                });
            }
        }

        Ok(())
    }

    /// Check that ARNs can be formatted under this context
    pub fn require_account_and_region(&self) -> ConfigResult<()> {
        self.account()?;
        self.region()?;
        Ok(())
    }

    fn account(&self) -> ConfigResult<&str> {
        self.account
            .as_deref()
            .ok_or(ConfigError::MissingContext { field: "account" })
    }

    fn region(&self) -> ConfigResult<&str> {
        self.region
            .as_deref()
            .ok_or(ConfigError::MissingContext { field: "region" })
    }

    /// Format an ARN for a resource living in this deployment context
    pub fn format_arn(
        &self,
        service: &str,
        resource: &str,
        resource_name: Option<&str>,
        format: ArnFormat,
    ) -> ConfigResult<String> {
        let mut components = ArnComponents::new(service, resource)
            .with_partition(&self.partition)
            .with_account(self.account()?)
            .with_region(self.region()?);
        if let Some(name) = resource_name {
            components = components.with_resource_name(name, format);
        }
        Ok(components.format())
    }
}
