use crate::identity::{application_arn, EnvironmentIdentity};
use resource_model::config::{ConfigResult, DeploymentEnv};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment as recorded by its parent application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRef {
    pub identity: EnvironmentIdentity,
    pub name: Option<String>,
}

/// Parent application of an environment.
///
/// Environments read the application id when they are built and register
/// themselves once construction succeeds.
pub trait ApplicationHandle {
    fn application_id(&self) -> &str;

    fn add_existing_environment(&mut self, environment: EnvironmentRef);
}

/// An existing AppConfig application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    application_id: String,
    application_arn: String,
    name: Option<String>,
    environments: Vec<EnvironmentRef>,
}

impl Application {
    pub fn from_application_id(
        env: &DeploymentEnv,
        application_id: impl Into<String>,
    ) -> ConfigResult<Self> {
        let application_id = application_id.into();
        let application_arn = application_arn(env, &application_id)?;
        Ok(Self {
            application_id,
            application_arn,
            name: None,
            environments: Vec::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn application_arn(&self) -> &str {
        &self.application_arn
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Environments registered so far, in registration order
    pub fn environments(&self) -> &[EnvironmentRef] {
        &self.environments
    }
}

impl ApplicationHandle for Application {
    fn application_id(&self) -> &str {
        &self.application_id
    }

    fn add_existing_environment(&mut self, environment: EnvironmentRef) {
        debug!(
            "Application {} now tracks environment {}",
            self.application_id, environment.identity.environment_id
        );
        self.environments.push(environment);
    }
}
