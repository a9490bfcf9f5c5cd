//! Identity of an AppConfig environment.
//!
//! An environment is addressed by its application id, its own id and the ARN
//! built from both:
//! `arn:<partition>:appconfig:<region>:<account>:application/<app>/environment/<env>`.
//! The resolver goes either way, from an ARN to the ids or from the ids (plus
//! a deployment context) to the ARN.

use crate::environment::{EnvironmentError, EnvironmentResult};
use resource_model::arn::{split_arn, ArnFormat};
use resource_model::config::{ConfigResult, DeploymentEnv};
use serde::{Deserialize, Serialize};

pub const APPCONFIG_SERVICE: &str = "appconfig";
pub const APPLICATION_RESOURCE: &str = "application";
pub const ENVIRONMENT_SEGMENT: &str = "environment";

/// Identity triple of an environment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentIdentity {
    pub application_id: String,
    pub environment_id: String,
    pub environment_arn: String,
}

impl EnvironmentIdentity {
    /// Resolve the identity of an environment from its ARN.
    ///
    /// The resource name must split on `/` into exactly
    /// `[applicationId, "environment", environmentId]` with non-empty ids.
    /// The ARN is kept verbatim.
    pub fn from_arn(arn: &str) -> EnvironmentResult<Self> {
        let components = split_arn(arn, ArnFormat::SlashResourceName)
            .map_err(|e| malformed(arn, e.to_string()))?;

        let resource_name = components
            .resource_name
            .ok_or_else(|| malformed(arn, "missing resource name"))?;

        let segments: Vec<&str> = resource_name.split('/').collect();
        let [application_id, kind, environment_id] = segments.as_slice() else {
            return Err(malformed(
                arn,
                format!(
                    "expected application/<applicationId>/environment/<environmentId>, found {} segment(s)",
                    segments.len()
                ),
            ));
        };

        if application_id.is_empty() {
            return Err(malformed(arn, "application id is empty"));
        }
        if environment_id.is_empty() {
            return Err(malformed(arn, "environment id is empty"));
        }
        if *kind != ENVIRONMENT_SEGMENT {
            return Err(malformed(
                arn,
                format!("expected \"{}\" segment, found \"{}\"", ENVIRONMENT_SEGMENT, kind),
            ));
        }

        Ok(Self {
            application_id: application_id.to_string(),
            environment_id: environment_id.to_string(),
            environment_arn: arn.to_string(),
        })
    }

    /// Resolve the identity of an environment from its ids, formatting the
    /// ARN under the given deployment context
    pub fn from_ids(
        env: &DeploymentEnv,
        application_id: &str,
        environment_id: &str,
    ) -> EnvironmentResult<Self> {
        if application_id.is_empty() {
            return Err(EnvironmentError::EmptyIdentifier {
                field: "application id",
            });
        }
        if environment_id.is_empty() {
            return Err(EnvironmentError::EmptyIdentifier {
                field: "environment id",
            });
        }

        let environment_arn = environment_arn(env, application_id, environment_id)?;
        Ok(Self {
            application_id: application_id.to_string(),
            environment_id: environment_id.to_string(),
            environment_arn,
        })
    }
}

pub fn environment_arn(
    env: &DeploymentEnv,
    application_id: &str,
    environment_id: &str,
) -> ConfigResult<String> {
    let resource_name = format!(
        "{}/{}/{}",
        application_id, ENVIRONMENT_SEGMENT, environment_id
    );
    env.format_arn(
        APPCONFIG_SERVICE,
        APPLICATION_RESOURCE,
        Some(&resource_name),
        ArnFormat::SlashResourceName,
    )
}

pub fn application_arn(env: &DeploymentEnv, application_id: &str) -> ConfigResult<String> {
    env.format_arn(
        APPCONFIG_SERVICE,
        APPLICATION_RESOURCE,
        Some(application_id),
        ArnFormat::SlashResourceName,
    )
}

fn malformed(arn: &str, reason: impl Into<String>) -> EnvironmentError {
    EnvironmentError::MalformedIdentifier {
        arn: arn.to_string(),
        reason: reason.into(),
    }
}
