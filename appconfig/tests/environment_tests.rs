//! End-to-end tests for declaring and importing environments

use appconfig::{
    AlarmReference, Application, ApplicationHandle, DeploymentEnv, Environment,
    EnvironmentAttributes, EnvironmentError, EnvironmentProps, EnvironmentRef, EventDestination,
    Extensible, ExtensionAttachment, IEnvironment, ImportedEnvironment, InMemorySink, Monitor,
    ResourceSink, RoleReference, ScopeContext,
};
use env_builder::BuildError;
use resource_model::iam::Effect;
use resource_model::sink::{EmittedResource, SinkError, SinkResult};
use resource_model::types::ResourceDefinition;

const ACCOUNT: &str = "111122223333";
const REGION: &str = "us-east-1";
const ALARM_A1: &str = "arn:aws:cloudwatch:us-east-1:111122223333:alarm:A1";
const ALARM_A2: &str = "arn:aws:cloudwatch:us-east-1:111122223333:alarm:A2";
const EXISTING_ROLE: &str = "arn:aws:iam::111122223333:role/alarm-reader";

fn deployment_env() -> DeploymentEnv {
    DeploymentEnv::new()
        .with_account(ACCOUNT)
        .with_region(REGION)
}

/// Application that counts how often environments register with it
#[derive(Default)]
struct CountingApplication {
    registrations: Vec<EnvironmentRef>,
}

impl ApplicationHandle for CountingApplication {
    fn application_id(&self) -> &str {
        "app1"
    }

    fn add_existing_environment(&mut self, environment: EnvironmentRef) {
        self.registrations.push(environment);
    }
}

/// Accepts roles but rejects every batch that holds an environment
#[derive(Default)]
struct EnvironmentRejectingSink {
    inner: InMemorySink,
}

impl ResourceSink for EnvironmentRejectingSink {
    fn resolve(&self, logical_id: &str, definition: &ResourceDefinition) -> EmittedResource {
        self.inner.resolve(logical_id, definition)
    }

    fn commit(
        &mut self,
        batch: Vec<(String, ResourceDefinition)>,
    ) -> SinkResult<Vec<EmittedResource>> {
        if let Some((logical_id, _)) = batch
            .iter()
            .find(|(_, d)| matches!(d, ResourceDefinition::Environment(_)))
        {
            return Err(SinkError::Rejected {
                logical_id: logical_id.clone(),
                message: "environments are not accepted".to_string(),
            });
        }
        self.inner.commit(batch)
    }

    fn sink_name(&self) -> &'static str {
        "environment-rejecting"
    }
}

/// Hands out empty environment references
#[derive(Default)]
struct BlankReferenceSink {
    inner: InMemorySink,
}

impl ResourceSink for BlankReferenceSink {
    fn resolve(&self, logical_id: &str, definition: &ResourceDefinition) -> EmittedResource {
        let mut handle = self.inner.resolve(logical_id, definition);
        if matches!(definition, ResourceDefinition::Environment(_)) {
            handle.reference = String::new();
        }
        handle
    }

    fn commit(
        &mut self,
        batch: Vec<(String, ResourceDefinition)>,
    ) -> SinkResult<Vec<EmittedResource>> {
        self.inner.commit(batch)
    }

    fn sink_name(&self) -> &'static str {
        "blank-reference"
    }
}

#[test]
fn test_import_by_arn() {
    let cases = [
        ("abc123", "def456"),
        ("a", "e"),
        ("app-with-dashes", "ENV_UPPER_9"),
    ];

    for (app, env) in cases {
        let arn = format!(
            "arn:aws:appconfig:{}:{}:application/{}/environment/{}",
            REGION, ACCOUNT, app, env
        );
        let imported = Environment::from_environment_arn(&arn).unwrap();
        assert_eq!(imported.application_id(), app);
        assert_eq!(imported.environment_id(), env);
        assert_eq!(imported.environment_arn(), arn);
        assert!(matches!(imported, ImportedEnvironment::ByArn { .. }));
    }
}

#[test]
fn test_import_by_arn_rejects_malformed() {
    let prefix = format!("arn:aws:appconfig:{}:{}:", REGION, ACCOUNT);
    let resources = [
        "application",
        "application/abc123",
        "application/abc123/environment",
        "application/abc123/environment/def456/more",
        "application//environment/def456",
        "application/abc123/environment/",
    ];

    for resource in resources {
        let arn = format!("{}{}", prefix, resource);
        let result = Environment::from_environment_arn(&arn);
        assert!(
            matches!(result, Err(EnvironmentError::MalformedIdentifier { .. })),
            "{} should not import",
            arn
        );
    }
}

#[test]
fn test_attributes_round_trip_through_arn() {
    let app = Application::from_application_id(&deployment_env(), "app-42").unwrap();
    let by_attributes = Environment::from_environment_attributes(
        &deployment_env(),
        EnvironmentAttributes::new(&app, "env-7"),
    )
    .unwrap();

    let by_arn = Environment::from_environment_arn(by_attributes.environment_arn()).unwrap();
    assert_eq!(by_arn.application_id(), "app-42");
    assert_eq!(by_arn.environment_id(), "env-7");
    assert_eq!(by_arn.identity(), by_attributes.identity());
}

#[test]
fn test_monitor_without_role_gets_least_privilege_role() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    let environment = Environment::new(
        &mut scope,
        &root,
        "Env",
        &mut app,
        &mut sink,
        EnvironmentProps::new().with_monitor(Monitor::from_cloudwatch_alarm(
            AlarmReference::from_alarm_arn(ALARM_A1),
            None,
        )),
    )
    .unwrap();

    let entry = &environment.descriptor().monitors[0];
    let role_arn = entry.alarm_role_arn.as_deref().unwrap();
    assert!(!role_arn.is_empty());

    let roles = environment.synthesized_roles();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].role_arn, role_arn);

    let emitted = match sink.get(&roles[0].logical_id) {
        Some(ResourceDefinition::Role(role)) => role,
        other => panic!("Expected an emitted role, got {:?}", other),
    };
    assert_eq!(emitted.assumed_by.as_str(), "appconfig.amazonaws.com");
    let statements: Vec<_> = emitted.statements().collect();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].effect, Effect::Allow);
    assert_eq!(statements[0].actions, vec!["cloudwatch:DescribeAlarms"]);
    assert_eq!(statements[0].resources, vec![ALARM_A1]);
}

#[test]
fn test_explicit_role_is_passed_through() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    let environment = Environment::new(
        &mut scope,
        &root,
        "Env",
        &mut app,
        &mut sink,
        EnvironmentProps::new()
            .with_monitor(Monitor::from_cloudwatch_alarm(
                AlarmReference::from_alarm_arn(ALARM_A1),
                Some(RoleReference::from_role_arn(EXISTING_ROLE)),
            ))
            .with_monitor(Monitor::from_cfn_monitors_property(
                ALARM_A2,
                Some(EXISTING_ROLE.to_string()),
            )),
    )
    .unwrap();

    assert!(environment.synthesized_roles().is_empty());
    for entry in &environment.descriptor().monitors {
        assert_eq!(entry.alarm_role_arn.as_deref(), Some(EXISTING_ROLE));
    }
    // Only the environment itself was emitted.
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_sibling_environments_get_distinct_names() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    let first = Environment::new(
        &mut scope,
        &root,
        "Beta",
        &mut app,
        &mut sink,
        EnvironmentProps::new(),
    )
    .unwrap();
    let second = Environment::new(
        &mut scope,
        &root,
        "Gamma",
        &mut app,
        &mut sink,
        EnvironmentProps::new(),
    )
    .unwrap();

    let first_name = first.name().unwrap();
    let second_name = second.name().unwrap();
    assert_ne!(first_name, second_name);
    assert!(first_name.len() <= 64);
    assert!(second_name.len() <= 64);
}

#[test]
fn test_long_paths_still_fit_name_limit() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let mut parent = scope.root().clone();
    for level in 0..6 {
        parent = scope
            .add_child(&parent, &format!("AVeryLongConstructIdentifierAtLevel{}", level))
            .unwrap();
    }
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    let environment = Environment::new(
        &mut scope,
        &parent,
        "Env",
        &mut app,
        &mut sink,
        EnvironmentProps::new(),
    )
    .unwrap();
    assert!(environment.name().unwrap().len() <= 64);
}

#[test]
fn test_end_to_end_app1_prod() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = Application::from_application_id(&deployment_env(), "app1").unwrap();
    let mut sink = InMemorySink::new();

    let environment = Environment::new(
        &mut scope,
        &root,
        "Prod",
        &mut app,
        &mut sink,
        EnvironmentProps::new().with_name("prod").with_monitor(
            Monitor::from_cloudwatch_alarm(AlarmReference::from_alarm_arn(ALARM_A1), None),
        ),
    )
    .unwrap();

    let descriptor = environment.descriptor();
    assert_eq!(descriptor.application_id, "app1");
    assert_eq!(descriptor.name, "prod");
    assert_eq!(descriptor.monitors.len(), 1);
    assert_eq!(descriptor.monitors[0].alarm_arn, ALARM_A1);
    assert_eq!(
        descriptor.monitors[0].alarm_role_arn.as_deref(),
        Some(environment.synthesized_roles()[0].role_arn.as_str())
    );

    assert_eq!(
        environment.environment_arn(),
        format!(
            "arn:aws:appconfig:{}:{}:application/app1/environment/{}",
            REGION,
            ACCOUNT,
            environment.environment_id()
        )
    );

    // The constructed ARN imports back to the same identity.
    let reimported = Environment::from_environment_arn(environment.environment_arn()).unwrap();
    assert_eq!(reimported.identity(), environment.identity());

    assert_eq!(app.environments().len(), 1);
    assert_eq!(app.environments()[0].identity, *environment.identity());
    assert_eq!(app.environments()[0].name.as_deref(), Some("prod"));

    let template = sink.to_template().unwrap();
    let resource = &template["Resources"][environment.logical_id()];
    assert_eq!(resource["Type"], "AWS::AppConfig::Environment");
    assert_eq!(resource["Properties"]["Name"], "prod");
}

#[test]
fn test_registers_exactly_once_per_environment() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    for id in ["Dev", "Staging", "Prod"] {
        Environment::new(
            &mut scope,
            &root,
            id,
            &mut app,
            &mut sink,
            EnvironmentProps::new(),
        )
        .unwrap();
    }

    assert_eq!(app.registrations.len(), 3);
    let mut ids: Vec<&str> = app
        .registrations
        .iter()
        .map(|r| r.identity.environment_id.as_str())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_failed_construction_does_not_register() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    Environment::new(
        &mut scope,
        &root,
        "Prod",
        &mut app,
        &mut sink,
        EnvironmentProps::new(),
    )
    .unwrap();
    let emitted = sink.len();

    // Same id twice under one parent.
    let duplicate = Environment::new(
        &mut scope,
        &root,
        "Prod",
        &mut app,
        &mut sink,
        EnvironmentProps::new(),
    );
    assert!(matches!(duplicate, Err(EnvironmentError::Scope(_))));
    assert_eq!(app.registrations.len(), 1);
    assert_eq!(sink.len(), emitted);
}

#[test]
fn test_missing_deployment_context_fails_before_emitting() {
    let mut scope = ScopeContext::new("Stack", DeploymentEnv::new());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    let result = Environment::new(
        &mut scope,
        &root,
        "Prod",
        &mut app,
        &mut sink,
        EnvironmentProps::new().with_monitor(Monitor::from_cloudwatch_alarm(
            AlarmReference::from_alarm_arn(ALARM_A1),
            None,
        )),
    );

    assert!(matches!(result, Err(EnvironmentError::Config(_))));
    assert!(sink.is_empty());
    assert!(app.registrations.is_empty());
    assert_eq!(scope.construct_count(), 1);
}

#[test]
fn test_hooks_on_every_environment_variant() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();
    let destination = EventDestination::lambda("arn:aws:lambda:us-east-1:111122223333:function:f");

    let mut constructed = Environment::new(
        &mut scope,
        &root,
        "Prod",
        &mut app,
        &mut sink,
        EnvironmentProps::new().with_name("prod"),
    )
    .unwrap();
    let mut by_arn = Environment::from_environment_arn(
        "arn:aws:appconfig:us-east-1:111122223333:application/app1/environment/e1",
    )
    .unwrap();
    let mut by_attributes = Environment::from_environment_attributes(
        &deployment_env(),
        EnvironmentAttributes::new(&app, "e2").with_name("imported"),
    )
    .unwrap();

    constructed.on_deployment_baking(destination.clone(), None);
    by_arn.pre_start_deployment(destination.clone(), None);
    by_attributes.on_deployment_rolled_back(destination, None);

    let sinks_before = sink.len();
    assert_eq!(constructed.extensible().attachments().len(), 1);
    assert_eq!(by_arn.extensible().attachments().len(), 1);
    assert_eq!(by_attributes.extensible().attachments().len(), 1);
    assert!(matches!(
        &constructed.extensible().attachments()[0],
        ExtensionAttachment::Hook { extension_name, .. } if extension_name == "prod-Extension-0"
    ));
    // Hooks never emit resources or re-register the environment.
    assert_eq!(sink.len(), sinks_before);
    assert_eq!(app.registrations.len(), 1);
}

#[test]
fn test_rejected_environment_leaves_nothing_behind() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = EnvironmentRejectingSink::default();
    let props = EnvironmentProps::new().with_monitor(Monitor::from_cloudwatch_alarm(
        AlarmReference::from_alarm_arn(ALARM_A1),
        None,
    ));

    let result = Environment::new(&mut scope, &root, "Prod", &mut app, &mut sink, props.clone());
    assert!(matches!(
        result,
        Err(EnvironmentError::Build(BuildError::Sink(SinkError::Rejected { .. })))
    ));
    assert!(sink.inner.is_empty());
    assert_eq!(scope.construct_count(), 1);
    assert!(app.registrations.is_empty());

    // The same id can be used once a sink accepts the batch.
    let mut accepting = InMemorySink::new();
    let environment =
        Environment::new(&mut scope, &root, "Prod", &mut app, &mut accepting, props).unwrap();
    assert_eq!(environment.synthesized_roles().len(), 1);
    assert_eq!(accepting.len(), 2);
    assert_eq!(app.registrations.len(), 1);
}

#[test]
fn test_empty_environment_reference_emits_nothing() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = BlankReferenceSink::default();

    let result = Environment::new(
        &mut scope,
        &root,
        "Prod",
        &mut app,
        &mut sink,
        EnvironmentProps::new().with_monitor(Monitor::from_cloudwatch_alarm(
            AlarmReference::from_alarm_arn(ALARM_A1),
            None,
        )),
    );

    assert!(matches!(result, Err(EnvironmentError::EmptyIdentifier { .. })));
    assert!(sink.inner.is_empty());
    assert_eq!(scope.construct_count(), 1);
    assert!(app.registrations.is_empty());
}

#[test]
fn test_raw_monitor_without_role_is_passed_through() {
    let mut scope = ScopeContext::new("Stack", deployment_env());
    let root = scope.root().clone();
    let mut app = CountingApplication::default();
    let mut sink = InMemorySink::new();

    let environment = Environment::new(
        &mut scope,
        &root,
        "Prod",
        &mut app,
        &mut sink,
        EnvironmentProps::new().with_monitor(Monitor::from_cfn_monitors_property(ALARM_A2, None)),
    )
    .unwrap();

    assert!(environment.synthesized_roles().is_empty());
    assert_eq!(environment.descriptor().monitors[0].alarm_role_arn, None);
    assert_eq!(sink.len(), 1);
}
