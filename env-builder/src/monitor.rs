//! Alarm monitors and their authorization roles.
//!
//! A monitor pairs a CloudWatch alarm with a role AppConfig assumes to read
//! that alarm's state during a rollout. When the caller does not bring a
//! role, [`synthesize_alarm_role`] describes the smallest role that works:
//! assumable only by AppConfig, allowed only `cloudwatch:DescribeAlarms`,
//! only on the one alarm.

use resource_model::arn::ArnFormat;
use resource_model::config::{ConfigResult, DeploymentEnv};
use resource_model::iam::{PolicyDocument, PolicyStatement, RoleDescriptor, ServicePrincipal};
use serde::{Deserialize, Serialize};

pub const APPCONFIG_PRINCIPAL: &str = "appconfig.amazonaws.com";
pub const DESCRIBE_ALARMS_ACTION: &str = "cloudwatch:DescribeAlarms";
pub const ALARM_POLICY_NAME: &str = "AllowAppConfigMonitorAlarmPolicy";

/// Reference to an existing CloudWatch alarm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmReference {
    pub alarm_arn: String,
}

impl AlarmReference {
    pub fn from_alarm_arn(alarm_arn: impl Into<String>) -> Self {
        Self {
            alarm_arn: alarm_arn.into(),
        }
    }

    /// Reference an alarm in the stack's own account and region by name
    pub fn from_alarm_name(env: &DeploymentEnv, alarm_name: &str) -> ConfigResult<Self> {
        let alarm_arn = env.format_arn(
            "cloudwatch",
            "alarm",
            Some(alarm_name),
            ArnFormat::ColonResourceName,
        )?;
        Ok(Self { alarm_arn })
    }
}

/// Reference to an existing IAM role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReference {
    pub role_arn: String,
}

impl RoleReference {
    pub fn from_role_arn(role_arn: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorType {
    /// Built from alarm and role references
    CloudWatch,
    /// Raw `AlarmArn`/`AlarmRoleArn` property values
    CfnMonitorsProperty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Monitor {
    CloudWatch {
        alarm: AlarmReference,
        alarm_role: Option<RoleReference>,
    },
    CfnMonitorsProperty {
        alarm_arn: String,
        alarm_role_arn: Option<String>,
    },
}

impl Monitor {
    pub fn from_cloudwatch_alarm(alarm: AlarmReference, alarm_role: Option<RoleReference>) -> Self {
        Monitor::CloudWatch { alarm, alarm_role }
    }

    pub fn from_cfn_monitors_property(
        alarm_arn: impl Into<String>,
        alarm_role_arn: Option<String>,
    ) -> Self {
        Monitor::CfnMonitorsProperty {
            alarm_arn: alarm_arn.into(),
            alarm_role_arn,
        }
    }

    pub fn monitor_type(&self) -> MonitorType {
        match self {
            Monitor::CloudWatch { .. } => MonitorType::CloudWatch,
            Monitor::CfnMonitorsProperty { .. } => MonitorType::CfnMonitorsProperty,
        }
    }

    pub fn alarm_arn(&self) -> &str {
        match self {
            Monitor::CloudWatch { alarm, .. } => &alarm.alarm_arn,
            Monitor::CfnMonitorsProperty { alarm_arn, .. } => alarm_arn,
        }
    }

    /// Role ARN supplied by the caller, if any
    pub fn alarm_role_arn(&self) -> Option<&str> {
        match self {
            Monitor::CloudWatch { alarm_role, .. } => {
                alarm_role.as_ref().map(|role| role.role_arn.as_str())
            }
            Monitor::CfnMonitorsProperty { alarm_role_arn, .. } => alarm_role_arn.as_deref(),
        }
    }

    /// CloudWatch monitors without a role get one synthesized. Raw monitor
    /// properties are passed through as given.
    pub fn needs_synthesized_role(&self) -> bool {
        matches!(self, Monitor::CloudWatch { alarm_role: None, .. })
    }
}

/// Construct id of the role synthesized for the monitor at `index`.
///
/// Ids are positional, so reordering monitors changes which alarm a given
/// role guards.
pub fn alarm_role_id(index: usize) -> String {
    format!("Role{}", index)
}

/// Least-privilege role letting AppConfig read one alarm's state
pub fn synthesize_alarm_role(alarm_arn: &str) -> RoleDescriptor {
    let statement = PolicyStatement::allow()
        .with_action(DESCRIBE_ALARMS_ACTION)
        .with_resource(alarm_arn);

    RoleDescriptor::new(ServicePrincipal::new(APPCONFIG_PRINCIPAL))
        .with_inline_policy(ALARM_POLICY_NAME, PolicyDocument::new(vec![statement]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_model::iam::Effect;

    const ALARM: &str = "arn:aws:cloudwatch:us-east-1:111122223333:alarm:A1";

    #[test]
    fn test_cloudwatch_monitor() {
        let monitor = Monitor::from_cloudwatch_alarm(AlarmReference::from_alarm_arn(ALARM), None);
        assert_eq!(monitor.monitor_type(), MonitorType::CloudWatch);
        assert_eq!(monitor.alarm_arn(), ALARM);
        assert_eq!(monitor.alarm_role_arn(), None);

        let monitor = Monitor::from_cloudwatch_alarm(
            AlarmReference::from_alarm_arn(ALARM),
            Some(RoleReference::from_role_arn("arn:aws:iam::111122223333:role/r")),
        );
        assert_eq!(
            monitor.alarm_role_arn(),
            Some("arn:aws:iam::111122223333:role/r")
        );
    }

    #[test]
    fn test_cfn_monitor_property() {
        let monitor = Monitor::from_cfn_monitors_property(ALARM, Some("arn:role".to_string()));
        assert_eq!(monitor.monitor_type(), MonitorType::CfnMonitorsProperty);
        assert_eq!(monitor.alarm_arn(), ALARM);
        assert_eq!(monitor.alarm_role_arn(), Some("arn:role"));
    }

    #[test]
    fn test_needs_synthesized_role() {
        let alarm = AlarmReference::from_alarm_arn(ALARM);
        assert!(Monitor::from_cloudwatch_alarm(alarm.clone(), None).needs_synthesized_role());
        assert!(!Monitor::from_cloudwatch_alarm(
            alarm,
            Some(RoleReference::from_role_arn("arn:aws:iam::111122223333:role/r")),
        )
        .needs_synthesized_role());
        assert!(!Monitor::from_cfn_monitors_property(ALARM, None).needs_synthesized_role());
    }

    #[test]
    fn test_alarm_from_name() {
        let env = DeploymentEnv::new()
            .with_account("111122223333")
            .with_region("us-east-1");
        let alarm = AlarmReference::from_alarm_name(&env, "A1").unwrap();
        assert_eq!(alarm.alarm_arn, ALARM);

        assert!(AlarmReference::from_alarm_name(&DeploymentEnv::new(), "A1").is_err());
    }

    #[test]
    fn test_alarm_role_ids() {
        assert_eq!(alarm_role_id(0), "Role0");
        assert_eq!(alarm_role_id(12), "Role12");
    }

    #[test]
    fn test_synthesized_role_is_least_privilege() {
        let role = synthesize_alarm_role(ALARM);
        assert_eq!(role.assumed_by.as_str(), "appconfig.amazonaws.com");
        assert_eq!(role.role_name, None);
        assert_eq!(role.inline_policies.len(), 1);
        assert!(role.inline_policies.contains_key(ALARM_POLICY_NAME));

        let statements: Vec<_> = role.statements().collect();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].effect, Effect::Allow);
        assert_eq!(statements[0].actions, vec!["cloudwatch:DescribeAlarms"]);
        assert_eq!(statements[0].resources, vec![ALARM]);
    }

    #[test]
    fn test_monitor_serialization() {
        let monitor = Monitor::from_cfn_monitors_property(ALARM, None);
        let json = serde_json::to_value(&monitor).unwrap();
        assert_eq!(json["type"], "cfn_monitors_property");
        let back: Monitor = serde_json::from_value(json).unwrap();
        assert_eq!(back, monitor);
    }
}
