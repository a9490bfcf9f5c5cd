//! ARN grammar.
//!
//! An ARN has the shape `arn:<partition>:<service>:<region>:<account>:<resource-part>`
//! where the resource part comes in one of three layouts:
//!
//! - `resource` ([`ArnFormat::NoResourceName`])
//! - `resource:name` ([`ArnFormat::ColonResourceName`])
//! - `resource/name` ([`ArnFormat::SlashResourceName`])
//!
//! AppConfig environments use the slash layout with a nested resource name:
//! `arn:aws:appconfig:us-east-1:111122223333:application/abc123/environment/def456`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing an ARN
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArnError {
    /// The ARN does not follow the provider grammar
    #[error("Malformed ARN '{arn}': {reason}")]
    Malformed { arn: String, reason: String },
}

pub type ArnResult<T> = Result<T, ArnError>;

/// How the resource part of an ARN is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArnFormat {
    /// `arn:aws:service:region:account:resource`
    NoResourceName,
    /// `arn:aws:service:region:account:resource:resourceName`
    ColonResourceName,
    /// `arn:aws:service:region:account:resource/resourceName`
    SlashResourceName,
}

impl ArnFormat {
    /// Separator between the resource and the resource name, if any
    pub fn separator(&self) -> Option<char> {
        match self {
            ArnFormat::NoResourceName => None,
            ArnFormat::ColonResourceName => Some(':'),
            ArnFormat::SlashResourceName => Some('/'),
        }
    }
}

/// The individual fields of an ARN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArnComponents {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource: String,
    pub resource_name: Option<String>,
    pub arn_format: ArnFormat,
}

impl ArnComponents {
    /// Components with no resource name, in the `aws` partition
    pub fn new(service: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            partition: "aws".to_string(),
            service: service.into(),
            region: String::new(),
            account: String::new(),
            resource: resource.into(),
            resource_name: None,
            arn_format: ArnFormat::NoResourceName,
        }
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Set the resource name and the layout used to attach it
    pub fn with_resource_name(mut self, resource_name: impl Into<String>, format: ArnFormat) -> Self {
        self.resource_name = Some(resource_name.into());
        self.arn_format = format;
        self
    }

    /// Render the components back into an ARN string
    pub fn format(&self) -> String {
        let mut arn = format!(
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        );
        if let (Some(sep), Some(name)) = (self.arn_format.separator(), &self.resource_name) {
            arn.push(sep);
            arn.push_str(name);
        }
        arn
    }
}

impl std::fmt::Display for ArnComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

fn malformed(arn: &str, reason: impl Into<String>) -> ArnError {
    ArnError::Malformed {
        arn: arn.to_string(),
        reason: reason.into(),
    }
}

/// Parse an ARN, detecting the resource layout from its shape.
///
/// A `/` in the resource component selects the slash layout (a single leading
/// `/` is skipped); otherwise any further `:` components select the colon
/// layout. Colon components that trail a slash resource name are joined back
/// onto the name.
pub fn parse_arn(arn: &str) -> ArnResult<ArnComponents> {
    let components: Vec<&str> = arn.split(':').collect();
    if components.len() < 6 {
        return Err(malformed(arn, "ARNs must have at least 6 components"));
    }

    let (head, rest) = components.split_at(6);
    let [prefix, partition, service, region, account, resource_part] = [
        head[0], head[1], head[2], head[3], head[4], head[5],
    ];

    if prefix != "arn" {
        return Err(malformed(arn, "ARNs must start with \"arn:\""));
    }
    if service.is_empty() {
        return Err(malformed(arn, "the service component (3rd) is required"));
    }
    if resource_part.is_empty() {
        return Err(malformed(arn, "the resource component (6th) is required"));
    }

    let (start, slash) = match resource_part.find('/') {
        Some(0) => (1, resource_part[1..].find('/').map(|i| i + 1)),
        other => (0, other),
    };

    let (resource, resource_name, arn_format) = match slash {
        Some(idx) => {
            let mut name = resource_part[idx + 1..].to_string();
            if !rest.is_empty() {
                name.push(':');
                name.push_str(&rest.join(":"));
            }
            (
                resource_part[start..idx].to_string(),
                Some(name),
                ArnFormat::SlashResourceName,
            )
        }
        None if !rest.is_empty() => (
            resource_part.to_string(),
            Some(rest.join(":")),
            ArnFormat::ColonResourceName,
        ),
        None => (resource_part.to_string(), None, ArnFormat::NoResourceName),
    };

    Ok(ArnComponents {
        partition: partition.to_string(),
        service: service.to_string(),
        region: region.to_string(),
        account: account.to_string(),
        resource,
        resource_name,
        arn_format,
    })
}

/// Parse an ARN and reinterpret its resource part in the given layout.
///
/// Unlike [`parse_arn`], the caller states which layout the resource uses, so
/// an ARN whose resource part has no separator of the requested kind comes
/// back with `resource_name: None` instead of being read in another layout.
pub fn split_arn(arn: &str, format: ArnFormat) -> ArnResult<ArnComponents> {
    let parsed = parse_arn(arn)?;
    if parsed.arn_format == format {
        return Ok(parsed);
    }

    // Rebuild the full resource part and split it the requested way.
    let full = match (&parsed.arn_format.separator(), &parsed.resource_name) {
        (Some(sep), Some(name)) => format!("{}{}{}", parsed.resource, sep, name),
        _ => parsed.resource.clone(),
    };

    let (resource, resource_name) = match format.separator() {
        Some(sep) => match full.split_once(sep) {
            Some((resource, name)) => (resource.to_string(), Some(name.to_string())),
            None => (full, None),
        },
        None => (full, None),
    };

    Ok(ArnComponents {
        resource,
        resource_name,
        arn_format: format,
        ..parsed
    })
}
