//! The AppConfig environment construct.
//!
//! [`Environment::new`] declares a new environment inside an application:
//! it resolves the environment (and any alarm roles its monitors need) and
//! its identity, emits them through the sink in one batch, registers the
//! constructs in the scope and finally registers it with the parent
//! application.
//!
//! Existing environments are referenced with
//! [`Environment::from_environment_arn`] or
//! [`Environment::from_environment_attributes`]. Imports emit nothing and do
//! not register with an application.

use crate::application::{ApplicationHandle, EnvironmentRef};
use crate::extension::{
    ActionPoint, EventDestination, Extensible, ExtensibleBase, Extension, ExtensionOptions,
};
use crate::identity::EnvironmentIdentity;
use env_builder::monitor::{AlarmReference, Monitor, RoleReference};
use env_builder::{
    commit_environment, plan_environment, BuildError, EnvironmentBuildConfig, SynthesizedRole,
};
use resource_model::config::{ConfigError, DeploymentEnv};
use resource_model::scope::{ConstructPath, ScopeContext, ScopeError};
use resource_model::sink::ResourceSink;
use resource_model::types::EnvironmentDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// AppConfig limits on environment properties
pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;
pub const MAX_MONITORS: usize = 5;

#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Malformed environment ARN '{arn}': {reason}")]
    MalformedIdentifier { arn: String, reason: String },

    #[error("The {field} cannot be empty")]
    EmptyIdentifier { field: &'static str },

    #[error("Invalid environment properties: {reason}")]
    InvalidProps { reason: String },

    #[error("Deployment context error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Failed to parse environment properties: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EnvironmentResult<T> = Result<T, EnvironmentError>;

/// Monitor entry as written in a properties file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorProps {
    pub alarm_arn: String,
    #[serde(default)]
    pub alarm_role_arn: Option<String>,
}

impl From<MonitorProps> for Monitor {
    fn from(props: MonitorProps) -> Self {
        Monitor::from_cloudwatch_alarm(
            AlarmReference::from_alarm_arn(props.alarm_arn),
            props.alarm_role_arn.map(RoleReference::from_role_arn),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct PropsFile {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    monitors: Vec<MonitorProps>,
}

/// Options for a new environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentProps {
    /// Generated from the construct path when unset
    pub name: Option<String>,
    pub description: Option<String>,
    pub monitors: Vec<Monitor>,
}

impl EnvironmentProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitors.push(monitor);
        self
    }

    /// Parse properties from TOML.
    ///
    /// ```toml
    /// name = "prod"
    /// description = "Production"
    ///
    /// [[monitors]]
    /// alarm_arn = "arn:aws:cloudwatch:us-east-1:111122223333:alarm:A1"
    /// ```
    pub fn from_toml_str(content: &str) -> EnvironmentResult<Self> {
        let file: PropsFile = toml::from_str(content)?;
        let props = Self {
            name: file.name,
            description: file.description,
            monitors: file.monitors.into_iter().map(Monitor::from).collect(),
        };
        props.validate()?;
        Ok(props)
    }

    pub fn from_file(path: impl AsRef<Path>) -> EnvironmentResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        debug!("Loaded environment properties from {}", path.as_ref().display());
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> EnvironmentResult<()> {
        if let Some(name) = &self.name {
            if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
                return Err(EnvironmentError::InvalidProps {
                    reason: format!(
                        "name must be between 1 and {} characters",
                        MAX_NAME_LENGTH
                    ),
                });
            }
        }

        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(EnvironmentError::InvalidProps {
                    reason: format!(
                        "description must be at most {} characters",
                        MAX_DESCRIPTION_LENGTH
                    ),
                });
            }
        }

        if self.monitors.len() > MAX_MONITORS {
            return Err(EnvironmentError::InvalidProps {
                reason: format!("at most {} monitors are allowed", MAX_MONITORS),
            });
        }

        if self.monitors.iter().any(|m| m.alarm_arn().is_empty()) {
            return Err(EnvironmentError::InvalidProps {
                reason: "monitor alarm ARN cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Common view over constructed and imported environments
pub trait IEnvironment: Extensible {
    fn identity(&self) -> &EnvironmentIdentity;

    /// Unknown for environments imported by ARN
    fn name(&self) -> Option<&str>;

    fn description(&self) -> Option<&str>;

    /// Unknown for environments imported by ARN
    fn monitors(&self) -> Option<&[Monitor]>;

    fn application_id(&self) -> &str {
        &self.identity().application_id
    }

    fn environment_id(&self) -> &str {
        &self.identity().environment_id
    }

    fn environment_arn(&self) -> &str {
        &self.identity().environment_arn
    }
}

/// An environment declared in this stack
#[derive(Debug, Clone)]
pub struct Environment {
    path: ConstructPath,
    identity: EnvironmentIdentity,
    name: String,
    description: Option<String>,
    monitors: Vec<Monitor>,
    descriptor: EnvironmentDescriptor,
    logical_id: String,
    synthesized_roles: Vec<SynthesizedRole>,
    extensible: ExtensibleBase,
}

impl Environment {
    /// Declare a new environment under `parent`.
    ///
    /// Every name, reference and identity is resolved before anything is
    /// emitted. The sink then takes the roles and the environment in one
    /// batch, the constructs enter the scope, and the application is told
    /// last. Any error leaves the scope, the sink and the application as they
    /// were.
    pub fn new(
        scope: &mut ScopeContext,
        parent: &ConstructPath,
        id: &str,
        application: &mut dyn ApplicationHandle,
        sink: &mut dyn ResourceSink,
        props: EnvironmentProps,
    ) -> EnvironmentResult<Self> {
        let application_id = application.application_id().to_string();
        if application_id.is_empty() {
            return Err(EnvironmentError::EmptyIdentifier {
                field: "application id",
            });
        }
        scope.env().require_account_and_region()?;

        let config = EnvironmentBuildConfig {
            application_id,
            name: props.name,
            description: props.description,
            monitors: props.monitors,
        };
        let plan = plan_environment(scope, parent, id, sink, &config)?;
        let identity = EnvironmentIdentity::from_ids(
            scope.env(),
            &config.application_id,
            &plan.build.environment_id,
        )?;
        let build = commit_environment(scope, sink, plan)?;
        let path = build.path.clone();

        let extensible =
            ExtensibleBase::new(identity.environment_arn.clone(), Some(build.name.clone()));

        application.add_existing_environment(EnvironmentRef {
            identity: identity.clone(),
            name: Some(build.name.clone()),
        });
        info!(
            "Created environment {} at {} in application {}",
            build.name, path, identity.application_id
        );

        Ok(Self {
            path,
            identity,
            name: build.name,
            description: config.description,
            monitors: config.monitors,
            descriptor: build.descriptor,
            logical_id: build.logical_id,
            synthesized_roles: build.synthesized_roles,
            extensible,
        })
    }

    /// Reference an existing environment by ARN
    pub fn from_environment_arn(arn: &str) -> EnvironmentResult<ImportedEnvironment> {
        let identity = EnvironmentIdentity::from_arn(arn)?;
        let extensible = ExtensibleBase::new(identity.environment_arn.clone(), None);
        debug!("Imported environment {}", identity.environment_arn);
        Ok(ImportedEnvironment::ByArn {
            identity,
            extensible,
        })
    }

    /// Reference an existing environment by its ids and known properties
    pub fn from_environment_attributes(
        env: &DeploymentEnv,
        attributes: EnvironmentAttributes,
    ) -> EnvironmentResult<ImportedEnvironment> {
        let identity = EnvironmentIdentity::from_ids(
            env,
            &attributes.application_id,
            &attributes.environment_id,
        )?;
        let extensible =
            ExtensibleBase::new(identity.environment_arn.clone(), attributes.name.clone());
        debug!("Imported environment {}", identity.environment_arn);
        Ok(ImportedEnvironment::ByAttributes {
            identity,
            name: attributes.name,
            description: attributes.description,
            monitors: attributes.monitors,
            extensible,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// Definition handed to the sink
    pub fn descriptor(&self) -> &EnvironmentDescriptor {
        &self.descriptor
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn synthesized_roles(&self) -> &[SynthesizedRole] {
        &self.synthesized_roles
    }

    pub fn extensible(&self) -> &ExtensibleBase {
        &self.extensible
    }
}

impl IEnvironment for Environment {
    fn identity(&self) -> &EnvironmentIdentity {
        &self.identity
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn monitors(&self) -> Option<&[Monitor]> {
        Some(&self.monitors)
    }
}

impl Extensible for Environment {
    fn on(
        &mut self,
        action_point: ActionPoint,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.extensible.on(action_point, destination, options);
    }

    fn add_extension(&mut self, extension: Extension) {
        self.extensible.add_extension(extension);
    }
}

/// Known properties of an existing environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentAttributes {
    pub application_id: String,
    pub environment_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub monitors: Option<Vec<Monitor>>,
}

impl EnvironmentAttributes {
    pub fn new(application: &dyn ApplicationHandle, environment_id: impl Into<String>) -> Self {
        Self {
            application_id: application.application_id().to_string(),
            environment_id: environment_id.into(),
            name: None,
            description: None,
            monitors: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_monitors(mut self, monitors: Vec<Monitor>) -> Self {
        self.monitors = Some(monitors);
        self
    }
}

/// An environment defined outside this stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedEnvironment {
    /// Only the identity is known
    ByArn {
        identity: EnvironmentIdentity,
        extensible: ExtensibleBase,
    },
    ByAttributes {
        identity: EnvironmentIdentity,
        name: Option<String>,
        description: Option<String>,
        monitors: Option<Vec<Monitor>>,
        extensible: ExtensibleBase,
    },
}

impl ImportedEnvironment {
    pub fn extensible(&self) -> &ExtensibleBase {
        match self {
            ImportedEnvironment::ByArn { extensible, .. }
            | ImportedEnvironment::ByAttributes { extensible, .. } => extensible,
        }
    }

    fn extensible_mut(&mut self) -> &mut ExtensibleBase {
        match self {
            ImportedEnvironment::ByArn { extensible, .. }
            | ImportedEnvironment::ByAttributes { extensible, .. } => extensible,
        }
    }
}

impl IEnvironment for ImportedEnvironment {
    fn identity(&self) -> &EnvironmentIdentity {
        match self {
            ImportedEnvironment::ByArn { identity, .. }
            | ImportedEnvironment::ByAttributes { identity, .. } => identity,
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            ImportedEnvironment::ByArn { .. } => None,
            ImportedEnvironment::ByAttributes { name, .. } => name.as_deref(),
        }
    }

    fn description(&self) -> Option<&str> {
        match self {
            ImportedEnvironment::ByArn { .. } => None,
            ImportedEnvironment::ByAttributes { description, .. } => description.as_deref(),
        }
    }

    fn monitors(&self) -> Option<&[Monitor]> {
        match self {
            ImportedEnvironment::ByArn { .. } => None,
            ImportedEnvironment::ByAttributes { monitors, .. } => monitors.as_deref(),
        }
    }
}

impl Extensible for ImportedEnvironment {
    fn on(
        &mut self,
        action_point: ActionPoint,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.extensible_mut().on(action_point, destination, options);
    }

    fn add_extension(&mut self, extension: Extension) {
        self.extensible_mut().add_extension(extension);
    }
}
