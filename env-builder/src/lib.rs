//! Resource definitions for AppConfig environments
//!
//! This crate turns typed environment options into the resource definitions
//! handed to the provisioning engine: it resolves the environment's display
//! name, maps every monitor to an alarm/role pair (synthesizing a role where
//! a CloudWatch monitor has none) and emits the environment itself.
//!
//! Building happens in two steps. [`plan_environment`] resolves every name,
//! logical id and reference without touching the scope or the sink.
//! [`commit_environment`] hands the whole batch to the sink and only then
//! registers the constructs in the scope, so a rejected batch leaves both
//! unchanged.

pub mod monitor;

use monitor::{alarm_role_id, synthesize_alarm_role, Monitor};
use resource_model::iam::RoleDescriptor;
use resource_model::scope::{
    make_logical_id, make_unique_resource_name, ConstructPath, ScopeContext, ScopeError,
    UniqueNameOptions,
};
use resource_model::sink::{ResourceSink, SinkError};
use resource_model::types::{EnvironmentDescriptor, MonitorEntry, ResourceDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Upper bound on generated environment names
pub const ENVIRONMENT_NAME_MAX_LENGTH: usize = 64;
pub const ENVIRONMENT_NAME_SEPARATOR: &str = "-";
/// Child id the environment resource itself is emitted under
pub const RESOURCE_ID: &str = "Resource";

/// Errors related to building environment definitions
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Role {logical_id} has no ARN in the {sink} sink")]
    MissingRoleArn {
        logical_id: String,
        sink: &'static str,
    },
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Options for building an environment definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentBuildConfig {
    /// Application the environment belongs to
    pub application_id: String,
    /// Display name; generated from the construct path when unset
    pub name: Option<String>,
    pub description: Option<String>,
    /// Monitors in the order they are attached
    pub monitors: Vec<Monitor>,
}

impl EnvironmentBuildConfig {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            ..Self::default()
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

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn with_monitors(mut self, monitors: Vec<Monitor>) -> Self {
        self.monitors = monitors;
        self
    }
}

/// Alarm role created on behalf of a monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedRole {
    /// Position of the monitor the role belongs to
    pub index: usize,
    pub path: ConstructPath,
    pub logical_id: String,
    pub alarm_arn: String,
    pub role_arn: String,
    pub descriptor: RoleDescriptor,
}

/// Everything resolved while building one environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentBuild {
    pub path: ConstructPath,
    pub descriptor: EnvironmentDescriptor,
    /// Resolved display name
    pub name: String,
    pub monitor_entries: Vec<MonitorEntry>,
    /// Identifier assigned by the sink
    pub environment_id: String,
    pub logical_id: String,
    pub synthesized_roles: Vec<SynthesizedRole>,
}

impl EnvironmentBuild {
    /// Definitions in emission order: roles first, then the environment
    pub fn definitions(&self) -> Vec<(String, ResourceDefinition)> {
        let mut batch: Vec<(String, ResourceDefinition)> = self
            .synthesized_roles
            .iter()
            .map(|role| {
                (
                    role.logical_id.clone(),
                    ResourceDefinition::Role(role.descriptor.clone()),
                )
            })
            .collect();
        batch.push((
            self.logical_id.clone(),
            ResourceDefinition::Environment(self.descriptor.clone()),
        ));
        batch
    }
}

/// A fully resolved environment that has not been committed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentPlan {
    pub parent: ConstructPath,
    pub build: EnvironmentBuild,
}

/// Name an environment at `path` gets when none is supplied
pub fn generated_environment_name(path: &ConstructPath) -> BuildResult<String> {
    let options = UniqueNameOptions::default()
        .with_max_length(ENVIRONMENT_NAME_MAX_LENGTH)
        .with_separator(ENVIRONMENT_NAME_SEPARATOR);
    make_unique_resource_name(path.components(), &options).map_err(BuildError::from)
}

/// Resolve the environment `id` under `parent` without emitting or
/// registering anything
pub fn plan_environment(
    scope: &ScopeContext,
    parent: &ConstructPath,
    id: &str,
    sink: &dyn ResourceSink,
    config: &EnvironmentBuildConfig,
) -> BuildResult<EnvironmentPlan> {
    let path = scope.check_child(parent, id)?;
    let name = match &config.name {
        Some(name) => name.clone(),
        None => generated_environment_name(&path)?,
    };
    let logical_id = make_logical_id(&path.child(RESOURCE_ID))?;

    let mut synthesized_roles = Vec::new();
    for (index, monitor) in config.monitors.iter().enumerate() {
        if !monitor.needs_synthesized_role() {
            continue;
        }
        let role_path = path.child(alarm_role_id(index));
        let role_logical_id = make_logical_id(&role_path)?;
        let alarm_arn = monitor.alarm_arn().to_string();
        let descriptor = synthesize_alarm_role(&alarm_arn);

        let handle = sink.resolve(&role_logical_id, &ResourceDefinition::Role(descriptor.clone()));
        let role_arn = handle.arn.ok_or_else(|| BuildError::MissingRoleArn {
            logical_id: role_logical_id.clone(),
            sink: sink.sink_name(),
        })?;

        synthesized_roles.push(SynthesizedRole {
            index,
            path: role_path,
            logical_id: role_logical_id,
            alarm_arn,
            role_arn,
            descriptor,
        });
    }

    let monitor_entries: Vec<MonitorEntry> = config
        .monitors
        .iter()
        .enumerate()
        .map(|(index, monitor)| {
            let role_arn = monitor.alarm_role_arn().map(str::to_string).or_else(|| {
                synthesized_roles
                    .iter()
                    .find(|role| role.index == index)
                    .map(|role| role.role_arn.clone())
            });
            MonitorEntry {
                alarm_arn: monitor.alarm_arn().to_string(),
                alarm_role_arn: role_arn,
            }
        })
        .collect();

    let mut descriptor = EnvironmentDescriptor::new(&config.application_id, &name)
        .with_monitors(monitor_entries.clone());
    descriptor.description = config.description.clone();

    let environment_id = sink
        .resolve(
            &logical_id,
            &ResourceDefinition::Environment(descriptor.clone()),
        )
        .reference;

    Ok(EnvironmentPlan {
        parent: parent.clone(),
        build: EnvironmentBuild {
            path,
            descriptor,
            name,
            monitor_entries,
            environment_id,
            logical_id,
            synthesized_roles,
        },
    })
}

/// Emit a planned environment and register its constructs.
///
/// The scope is checked again first, then the sink takes every definition in
/// one batch. Constructs enter the scope only after the sink accepted them.
pub fn commit_environment(
    scope: &mut ScopeContext,
    sink: &mut dyn ResourceSink,
    plan: EnvironmentPlan,
) -> BuildResult<EnvironmentBuild> {
    let EnvironmentPlan { parent, build } = plan;
    scope.check_child(&parent, build.path.id())?;

    let emitted = sink.commit(build.definitions())?;
    debug!(
        "Committed {} resource(s) for environment {} to {} sink",
        emitted.len(),
        build.name,
        sink.sink_name()
    );

    let path = scope.add_child(&parent, build.path.id())?;
    scope.add_child(&path, RESOURCE_ID)?;
    for role in &build.synthesized_roles {
        scope.add_child(&path, role.path.id())?;
        debug!(
            "Synthesized alarm role {} for monitor {} ({})",
            role.path, role.index, role.alarm_arn
        );
    }

    Ok(build)
}

/// Plan and commit in one step
pub fn build_environment(
    scope: &mut ScopeContext,
    parent: &ConstructPath,
    id: &str,
    sink: &mut dyn ResourceSink,
    config: &EnvironmentBuildConfig,
) -> BuildResult<EnvironmentBuild> {
    let plan = plan_environment(scope, parent, id, sink, config)?;
    commit_environment(scope, sink, plan)
}
