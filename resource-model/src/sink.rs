use crate::types::ResourceDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Duplicate logical id: {logical_id}")]
    DuplicateLogicalId { logical_id: String },

    #[error("Resource {logical_id} rejected: {message}")]
    Rejected { logical_id: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Handle the provisioning engine returns for an emitted resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedResource {
    pub logical_id: String,
    /// Identifier the engine assigns on deployment (the `Ref` value)
    pub reference: String,
    /// ARN attribute, for resources that expose one
    pub arn: Option<String>,
}

/// Destination for resource definitions.
///
/// Implementations stand in for the declarative provisioning engine: they
/// accept definitions under logical ids and hand back references that
/// resolve once the stack is deployed. References are a function of the
/// logical id and resource kind, so they can be resolved before anything is
/// committed.
pub trait ResourceSink {
    /// Handle the engine will assign to `definition` under `logical_id`.
    /// Nothing is emitted.
    fn resolve(&self, logical_id: &str, definition: &ResourceDefinition) -> EmittedResource;

    /// Accept a batch of definitions. On error none of them is kept.
    fn commit(
        &mut self,
        batch: Vec<(String, ResourceDefinition)>,
    ) -> SinkResult<Vec<EmittedResource>>;

    fn sink_name(&self) -> &'static str;

    fn emit(
        &mut self,
        logical_id: &str,
        definition: ResourceDefinition,
    ) -> SinkResult<EmittedResource> {
        let mut emitted = self.commit(vec![(logical_id.to_string(), definition)])?;
        emitted.pop().ok_or_else(|| SinkError::Rejected {
            logical_id: logical_id.to_string(),
            message: "the sink accepted nothing".to_string(),
        })
    }
}

/// Sink that keeps every definition in memory, in emission order
#[derive(Debug, Default)]
pub struct InMemorySink {
    resources: Vec<(String, ResourceDefinition)>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resources(&self) -> &[(String, ResourceDefinition)] {
        &self.resources
    }

    pub fn get(&self, logical_id: &str) -> Option<&ResourceDefinition> {
        self.resources
            .iter()
            .find(|(id, _)| id == logical_id)
            .map(|(_, definition)| definition)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// `Resources` section of a template holding everything emitted so far
    pub fn to_template(&self) -> SinkResult<serde_json::Value> {
        let mut resources = serde_json::Map::new();
        for (logical_id, definition) in &self.resources {
            resources.insert(logical_id.clone(), definition.to_template()?);
        }
        Ok(serde_json::json!({ "Resources": resources }))
    }

    pub fn to_json(&self) -> SinkResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_template()?)?)
    }
}

impl ResourceSink for InMemorySink {
    fn resolve(&self, logical_id: &str, definition: &ResourceDefinition) -> EmittedResource {
        let arn = match definition {
            ResourceDefinition::Role(_) => Some(format!("${{Token[GetAtt.{}.Arn]}}", logical_id)),
            ResourceDefinition::Environment(_) => None,
        };
        EmittedResource {
            logical_id: logical_id.to_string(),
            reference: format!("${{Token[Ref.{}]}}", logical_id),
            arn,
        }
    }

    fn commit(
        &mut self,
        batch: Vec<(String, ResourceDefinition)>,
    ) -> SinkResult<Vec<EmittedResource>> {
        let mut seen = HashSet::new();
        for (logical_id, _) in &batch {
            if self.get(logical_id).is_some() || !seen.insert(logical_id.as_str()) {
                return Err(SinkError::DuplicateLogicalId {
                    logical_id: logical_id.clone(),
                });
            }
        }

        let mut emitted = Vec::with_capacity(batch.len());
        for (logical_id, definition) in batch {
            debug!(
                "Emitted {} as {}",
                definition.resource_type(),
                logical_id
            );
            emitted.push(self.resolve(&logical_id, &definition));
            self.resources.push((logical_id, definition));
        }
        Ok(emitted)
    }

    fn sink_name(&self) -> &'static str {
        "in-memory"
    }
}
