pub mod arn;
pub mod config;
pub mod iam;
pub mod scope;
pub mod sink;
pub mod types;

pub use arn::{parse_arn, split_arn, ArnComponents, ArnError, ArnFormat, ArnResult};
pub use config::{ConfigError, ConfigResult, DeploymentEnv};
pub use iam::{Effect, PolicyDocument, PolicyStatement, RoleDescriptor, ServicePrincipal};
pub use scope::{ConstructPath, ScopeContext, ScopeError, ScopeResult, UniqueNameOptions};
pub use sink::{EmittedResource, InMemorySink, ResourceSink, SinkError, SinkResult};
pub use types::{EnvironmentDescriptor, MonitorEntry, ResourceDefinition};

pub mod prelude {
    pub use crate::arn::*;
    pub use crate::config::*;
    pub use crate::iam::*;
    pub use crate::scope::*;
    pub use crate::sink::*;
    pub use crate::types::*;
}
