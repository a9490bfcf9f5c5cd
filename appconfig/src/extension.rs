//! Extension hooks on AppConfig resources.
//!
//! An extensible resource accepts hooks at a fixed set of action points in
//! the deployment lifecycle. [`ExtensibleBase`] holds the resource's ARN and
//! name and keeps an ordered log of what was attached; resources that support
//! hooks hold one and forward the [`Extensible`] calls to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Stage of a configuration deployment at which an extension can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPoint {
    PreCreateHostedConfigurationVersion,
    PreStartDeployment,
    OnDeploymentStart,
    OnDeploymentStep,
    OnDeploymentBaking,
    OnDeploymentComplete,
    OnDeploymentRolledBack,
}

impl ActionPoint {
    pub const ALL: [ActionPoint; 7] = [
        ActionPoint::PreCreateHostedConfigurationVersion,
        ActionPoint::PreStartDeployment,
        ActionPoint::OnDeploymentStart,
        ActionPoint::OnDeploymentStep,
        ActionPoint::OnDeploymentBaking,
        ActionPoint::OnDeploymentComplete,
        ActionPoint::OnDeploymentRolledBack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPoint::PreCreateHostedConfigurationVersion => {
                "PRE_CREATE_HOSTED_CONFIGURATION_VERSION"
            }
            ActionPoint::PreStartDeployment => "PRE_START_DEPLOYMENT",
            ActionPoint::OnDeploymentStart => "ON_DEPLOYMENT_START",
            ActionPoint::OnDeploymentStep => "ON_DEPLOYMENT_STEP",
            ActionPoint::OnDeploymentBaking => "ON_DEPLOYMENT_BAKING",
            ActionPoint::OnDeploymentComplete => "ON_DEPLOYMENT_COMPLETE",
            ActionPoint::OnDeploymentRolledBack => "ON_DEPLOYMENT_ROLLED_BACK",
        }
    }
}

impl fmt::Display for ActionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of target an extension action invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Lambda,
    Sqs,
    Sns,
    Events,
}

/// Target invoked when an action point fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDestination {
    pub extension_uri: String,
    pub source_type: SourceType,
}

impl EventDestination {
    pub fn lambda(function_arn: impl Into<String>) -> Self {
        Self::new(function_arn, SourceType::Lambda)
    }

    pub fn sqs(queue_arn: impl Into<String>) -> Self {
        Self::new(queue_arn, SourceType::Sqs)
    }

    pub fn sns(topic_arn: impl Into<String>) -> Self {
        Self::new(topic_arn, SourceType::Sns)
    }

    pub fn event_bridge(event_bus_arn: impl Into<String>) -> Self {
        Self::new(event_bus_arn, SourceType::Events)
    }

    fn new(extension_uri: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            extension_uri: extension_uri.into(),
            source_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Options for a hook attached through [`Extensible::on`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionOptions {
    pub extension_name: Option<String>,
    pub description: Option<String>,
    pub latest_version_number: Option<u32>,
    pub parameters: Vec<Parameter>,
}

impl ExtensionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension_name(mut self, name: impl Into<String>) -> Self {
        self.extension_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_latest_version_number(mut self, version: u32) -> Self {
        self.latest_version_number = Some(version);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// One destination invoked at one or more action points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: Option<String>,
    pub action_points: Vec<ActionPoint>,
    pub event_destination: EventDestination,
}

impl Action {
    pub fn new(action_points: Vec<ActionPoint>, event_destination: EventDestination) -> Self {
        Self {
            name: None,
            action_points,
            event_destination,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A complete extension, attached through [`Extensible::add_extension`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub description: Option<String>,
    pub actions: Vec<Action>,
    pub parameters: Vec<Parameter>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            actions: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn action_points(&self) -> impl Iterator<Item = ActionPoint> + '_ {
        self.actions
            .iter()
            .flat_map(|action| action.action_points.iter().copied())
    }
}

/// Entry in an extensible resource's attachment log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtensionAttachment {
    Hook {
        extension_name: String,
        action_point: ActionPoint,
        destination: EventDestination,
        options: ExtensionOptions,
    },
    Extension(Extension),
}

impl ExtensionAttachment {
    pub fn extension_name(&self) -> &str {
        match self {
            ExtensionAttachment::Hook { extension_name, .. } => extension_name,
            ExtensionAttachment::Extension(extension) => &extension.name,
        }
    }

    pub fn fires_at(&self, point: ActionPoint) -> bool {
        match self {
            ExtensionAttachment::Hook { action_point, .. } => *action_point == point,
            ExtensionAttachment::Extension(extension) => {
                extension.action_points().any(|p| p == point)
            }
        }
    }
}

/// Hook registration on a resource that supports extensions.
///
/// Implementors provide [`on`](Extensible::on) and
/// [`add_extension`](Extensible::add_extension); the per-action-point methods
/// are shorthands for `on`.
pub trait Extensible {
    fn on(
        &mut self,
        action_point: ActionPoint,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    );

    fn add_extension(&mut self, extension: Extension);

    fn pre_create_hosted_configuration_version(
        &mut self,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.on(
            ActionPoint::PreCreateHostedConfigurationVersion,
            destination,
            options,
        );
    }

    fn pre_start_deployment(
        &mut self,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.on(ActionPoint::PreStartDeployment, destination, options);
    }

    fn on_deployment_start(
        &mut self,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.on(ActionPoint::OnDeploymentStart, destination, options);
    }

    fn on_deployment_step(
        &mut self,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.on(ActionPoint::OnDeploymentStep, destination, options);
    }

    fn on_deployment_baking(
        &mut self,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.on(ActionPoint::OnDeploymentBaking, destination, options);
    }

    fn on_deployment_complete(
        &mut self,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.on(ActionPoint::OnDeploymentComplete, destination, options);
    }

    fn on_deployment_rolled_back(
        &mut self,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        self.on(ActionPoint::OnDeploymentRolledBack, destination, options);
    }
}

/// Extension state of a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensibleBase {
    resource_arn: String,
    resource_name: Option<String>,
    attachments: Vec<ExtensionAttachment>,
}

impl ExtensibleBase {
    pub fn new(resource_arn: impl Into<String>, resource_name: Option<String>) -> Self {
        Self {
            resource_arn: resource_arn.into(),
            resource_name,
            attachments: Vec::new(),
        }
    }

    pub fn resource_arn(&self) -> &str {
        &self.resource_arn
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.resource_name.as_deref()
    }

    /// Everything attached so far, in attachment order
    pub fn attachments(&self) -> &[ExtensionAttachment] {
        &self.attachments
    }

    pub fn attachments_at(&self, point: ActionPoint) -> Vec<&ExtensionAttachment> {
        self.attachments
            .iter()
            .filter(|attachment| attachment.fires_at(point))
            .collect()
    }

    // Hooks without an explicit name are numbered per resource.
    fn default_extension_name(&self) -> String {
        let owner = self.resource_name.as_deref().unwrap_or("Resource");
        format!("{}-Extension-{}", owner, self.attachments.len())
    }
}

impl Extensible for ExtensibleBase {
    fn on(
        &mut self,
        action_point: ActionPoint,
        destination: EventDestination,
        options: Option<ExtensionOptions>,
    ) {
        let options = options.unwrap_or_default();
        let extension_name = options
            .extension_name
            .clone()
            .unwrap_or_else(|| self.default_extension_name());

        debug!(
            "Attaching {} hook {} to {}",
            action_point, extension_name, self.resource_arn
        );
        self.attachments.push(ExtensionAttachment::Hook {
            extension_name,
            action_point,
            destination,
            options,
        });
    }

    fn add_extension(&mut self, extension: Extension) {
        debug!(
            "Attaching extension {} to {}",
            extension.name, self.resource_arn
        );
        self.attachments.push(ExtensionAttachment::Extension(extension));
    }
}
