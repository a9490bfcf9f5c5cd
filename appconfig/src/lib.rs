pub mod application;
pub mod environment;
pub mod extension;
pub mod identity;
pub mod telemetry;

pub use application::{Application, ApplicationHandle, EnvironmentRef};
pub use environment::{
    Environment, EnvironmentAttributes, EnvironmentError, EnvironmentProps, EnvironmentResult,
    IEnvironment, ImportedEnvironment, MonitorProps,
};
pub use extension::{
    Action, ActionPoint, EventDestination, Extensible, ExtensibleBase, Extension,
    ExtensionAttachment, ExtensionOptions, Parameter, SourceType,
};
pub use identity::{application_arn, environment_arn, EnvironmentIdentity};
pub use telemetry::{init_logging, LoggingConfig, TelemetryError};

pub use env_builder::monitor::{AlarmReference, Monitor, MonitorType, RoleReference};
pub use resource_model::{ConstructPath, DeploymentEnv, InMemorySink, ResourceSink, ScopeContext};
