//! Integration tests for service resolution.

use gateway_svcreg::function::{
    FunctionState, ServiceAddressFunctionProcessor, ServiceHostFunctionProcessor,
    ServicePathFunctionProcessor, ServicePortFunctionProcessor, ServiceSchemeFunctionProcessor,
    ServiceUrlFunctionProcessor,
};
use gateway_svcreg::http::{AdminRequest, Method};
use gateway_svcreg::jwt::JwtToken;
use gateway_svcreg::prelude::*;
use gateway_svcreg::rewrite::RewriteDirection;
use gateway_svcreg::runtime::AdminState;
use gateway_svcreg::topology::build_snapshot;
use proptest::prelude::*;
use std::sync::Arc;

const CLUSTER: &str = "test-cluster";
const SERVICE_URL: &str = "test-scheme://test-host:777/test-path";

fn test_environment() -> ResolutionEnvironment {
    let snapshot = RegistrySnapshot::builder()
        .service(CLUSTER, "test-service", SERVICE_URL)
        .build();
    let services = GatewayServices::new().with_registry(Arc::new(snapshot));
    ResolutionEnvironment::new(Arc::new(services), CLUSTER)
}

fn bound<P: FunctionProcessor>(mut processor: P, env: &ResolutionEnvironment) -> P {
    processor.initialize(Some(env), None).unwrap();
    processor
}

fn all_processors() -> Vec<Box<dyn FunctionProcessor>> {
    vec![
        Box::new(ServiceUrlFunctionProcessor::new()),
        Box::new(ServiceAddressFunctionProcessor::new()),
        Box::new(ServiceHostFunctionProcessor::new()),
        Box::new(ServicePortFunctionProcessor::new()),
        Box::new(ServiceSchemeFunctionProcessor::new()),
        Box::new(ServicePathFunctionProcessor::new()),
    ]
}

#[test]
fn test_port_scenario() {
    let env = test_environment();
    let processor = bound(ServicePortFunctionProcessor::new(), &env);
    let ctx = RewriteContext::default();

    assert_eq!(processor.name(), "servicePort");
    assert_eq!(
        processor.resolve(&ctx, Some("test-service")).as_deref(),
        Some("777")
    );
    assert_eq!(
        processor.resolve(&ctx, Some("invalid-test-service")).as_deref(),
        Some("invalid-test-service")
    );
    assert_eq!(processor.resolve(&ctx, None), None);
}

#[test]
fn test_every_component_of_one_url() {
    let env = test_environment();
    let ctx = RewriteContext::default();

    let expected = [
        ("serviceUrl", SERVICE_URL),
        ("serviceAddress", "test-host:777"),
        ("serviceHost", "test-host"),
        ("servicePort", "777"),
        ("serviceScheme", "test-scheme"),
        ("servicePath", "/test-path"),
    ];

    for (mut processor, (name, value)) in all_processors().into_iter().zip(expected) {
        processor.initialize(Some(&env), None).unwrap();
        assert_eq!(processor.name(), name);
        assert_eq!(processor.state(), FunctionState::Bound);
        assert_eq!(processor.cluster(), Some(CLUSTER));
        assert_eq!(
            processor.resolve(&ctx, Some("test-service")).as_deref(),
            Some(value),
            "{}",
            name
        );
        assert_eq!(processor.resolve(&ctx, None), None, "{}", name);
    }
}

#[test]
fn test_initialize_without_environment_fails() {
    for mut processor in all_processors() {
        let err = processor.initialize(None, None).unwrap_err();

        assert!(matches!(err, FunctionError::IllegalArgument(_)));
        assert!(err.to_string().contains("environment"));
        assert_eq!(processor.state(), FunctionState::Uninitialized);
    }
}

#[test]
fn test_destroy_releases_binding() {
    let env = test_environment();
    let ctx = RewriteContext::default();

    for mut processor in all_processors() {
        processor.initialize(Some(&env), None).unwrap();
        assert!(processor.registry().is_some());

        processor.destroy();
        processor.destroy();

        assert_eq!(processor.state(), FunctionState::Uninitialized);
        assert!(processor.cluster().is_none());
        assert!(processor.registry().is_none());
        assert_eq!(
            processor.resolve(&ctx, Some("test-service")).as_deref(),
            Some("test-service")
        );
    }
}

#[test]
fn test_missing_registry_or_cluster_misses() {
    let ctx = RewriteContext::default();

    let no_registry =
        ResolutionEnvironment::new(Arc::new(GatewayServices::new()), CLUSTER);
    let processor = bound(ServiceHostFunctionProcessor::new(), &no_registry);
    assert_eq!(
        processor.resolve(&ctx, Some("test-service")).as_deref(),
        Some("test-service")
    );

    let processor = bound(ServiceHostFunctionProcessor::new(), &ResolutionEnvironment::empty());
    assert_eq!(processor.state(), FunctionState::Bound);
    assert_eq!(
        processor.resolve(&ctx, Some("test-service")).as_deref(),
        Some("test-service")
    );
}

#[test]
fn test_resolution_ignores_direction() {
    let env = test_environment();
    let request = RewriteContext::new(RewriteDirection::Request);
    let response = RewriteContext::new(RewriteDirection::Response);

    for mut processor in all_processors() {
        processor.initialize(Some(&env), None).unwrap();
        assert_eq!(
            processor.resolve(&request, Some("test-service")),
            processor.resolve(&response, Some("test-service"))
        );
    }
}

#[test]
fn test_session_dispatch() {
    let env = test_environment();
    let ctx = RewriteContext::default();
    let mut session = FunctionRegistry::global().session(&env);

    assert_eq!(
        session.resolve("serviceAddress", &ctx, Some("test-service")).unwrap().as_deref(),
        Some("test-host:777")
    );
    assert_eq!(
        session.resolve("servicePort", &ctx, Some("test-service")).unwrap().as_deref(),
        Some("777")
    );
    assert_eq!(
        session.resolve("servicePort", &ctx, Some("other")).unwrap().as_deref(),
        Some("other")
    );
    assert_eq!(session.active_count(), 2);

    let err = session
        .resolve("serviceColor", &ctx, Some("test-service"))
        .unwrap_err();
    assert_eq!(err, FunctionError::UnknownFunction("serviceColor".into()));
    assert_eq!(err.code(), 404);

    session.close();
}

#[test]
fn test_republish_visible_to_bound_processor() {
    let registry = Arc::new(DefaultServiceRegistry::with_snapshot(
        RegistrySnapshot::builder()
            .service(CLUSTER, "test-service", "http://old-host:1000/")
            .build(),
    ));
    let services = GatewayServices::new().with_registry(registry.clone());
    let env = ResolutionEnvironment::new(Arc::new(services), CLUSTER);
    let processor = bound(ServiceHostFunctionProcessor::new(), &env);
    let ctx = RewriteContext::default();

    assert_eq!(
        processor.resolve(&ctx, Some("test-service")).as_deref(),
        Some("old-host")
    );

    registry.publish(
        RegistrySnapshot::builder()
            .service(CLUSTER, "test-service", "http://new-host:2000/")
            .build(),
    );

    assert_eq!(
        processor.resolve(&ctx, Some("test-service")).as_deref(),
        Some("new-host")
    );
}

#[test]
fn test_concurrent_resolution_during_publish() {
    let snapshot = |port: u16| {
        let mut builder = RegistrySnapshot::builder();
        for i in 0..8 {
            builder = builder.service(CLUSTER, format!("svc-{}", i), format!("http://h{}:{}/", i, port));
        }
        builder.build()
    };

    let registry = Arc::new(DefaultServiceRegistry::with_snapshot(snapshot(1000)));
    let services = GatewayServices::new().with_registry(registry.clone());
    let env = ResolutionEnvironment::new(Arc::new(services), CLUSTER);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let env = &env;
            scope.spawn(move || {
                let processor = bound(ServicePortFunctionProcessor::new(), env);
                let ctx = RewriteContext::default();
                for round in 0..500 {
                    let name = format!("svc-{}", round % 8);
                    let port = processor.resolve(&ctx, Some(&name));
                    assert!(
                        matches!(port.as_deref(), Some("1000") | Some("2000")),
                        "torn read: {:?}",
                        port
                    );
                }
            });
        }

        scope.spawn(|| {
            for round in 0..200 {
                registry.publish(snapshot(if round % 2 == 0 { 2000 } else { 1000 }));
            }
        });
    });
}

#[test]
fn test_topology_store_feeds_resolution() {
    let state = AdminState::new(Arc::new(MemoryTopologyStore::new()));

    let response = tokio_test::block_on(state.handle(
        AdminRequest::new(Method::Put, "/api/v1/topologies/sandbox").body(
            r#"{"name":"sandbox","services":[{"role":"HIVE","urls":["https://hive.example.com:10001/cliservice"]}]}"#,
        ),
    ));
    assert!(response.status.is_success());

    let services = GatewayServices::new().with_registry(state.registry());
    let env = ResolutionEnvironment::new(Arc::new(services), "sandbox");
    let ctx = RewriteContext::default();
    let mut session = FunctionRegistry::global().session(&env);

    assert_eq!(
        session.resolve("serviceScheme", &ctx, Some("HIVE")).unwrap().as_deref(),
        Some("https")
    );
    assert_eq!(
        session.resolve("servicePath", &ctx, Some("HIVE")).unwrap().as_deref(),
        Some("/cliservice")
    );

    let response = tokio_test::block_on(
        state.handle(AdminRequest::new(Method::Delete, "/api/v1/topologies/sandbox")),
    );
    assert_eq!(response.text_body(), Some(r#"{"deleted":true}"#.to_string()));
    assert_eq!(
        session.resolve("serviceScheme", &ctx, Some("HIVE")).unwrap().as_deref(),
        Some("HIVE")
    );
}

#[tokio::test]
async fn test_admin_resolve_endpoint() {
    let state = AdminState::new(Arc::new(MemoryTopologyStore::new()));
    state
        .handle(AdminRequest::new(Method::Put, "/api/v1/topologies/sandbox").body(
            r#"{"name":"sandbox","services":[{"role":"WEBHDFS","urls":["http://nn:50070/webhdfs"]}]}"#,
        ))
        .await;

    let response = state
        .handle(AdminRequest::new(
            Method::Get,
            "/api/v1/clusters/sandbox/functions/servicePort/WEBHDFS",
        ))
        .await;
    assert_eq!(response.text_body(), Some("50070".to_string()));

    let response = state
        .handle(AdminRequest::new(Method::Get, "/api/v1/functions"))
        .await;
    let names: Vec<String> = response.json_body().unwrap().unwrap();
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"serviceUrl".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admin_writes_leave_registry_matching_store() {
    let store = Arc::new(MemoryTopologyStore::new());
    let state = Arc::new(AdminState::new(store.clone()));

    let mut tasks = Vec::new();
    for worker in 0..4 {
        let state = state.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..25 {
                let name = format!("cluster-{}", (worker + round) % 6);
                let path = format!("/api/v1/topologies/{}", name);
                let request = if round % 3 == 2 {
                    AdminRequest::new(Method::Delete, path)
                } else {
                    AdminRequest::new(Method::Put, path).body(format!(
                        r#"{{"name":"{}","services":[{{"role":"WEBHDFS","urls":["http://nn{}:{}/webhdfs"]}}]}}"#,
                        name,
                        worker,
                        50000 + round
                    ))
                };
                assert!(state.handle(request).await.status.is_success());
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let expected = build_snapshot(&store.list().await.unwrap());
    assert_eq!(*state.registry().snapshot(), expected);
}

#[test]
fn test_jwt_claims_from_wire() {
    let header = "eyJhbGciOiJSUzI1NiJ9";
    let claims = "eyJzdWIiOiJndWVzdCIsImlzcyI6IktOT1hTU08iLCJleHAiOiIxMzYzMjE1MDkwIn0";
    let wire = format!("{}.{}.c2ln", header, claims);

    let token = JwtToken::parse(&wire).unwrap();

    assert_eq!(token.header(), r#"{"alg":"RS256"}"#);
    assert_eq!(token.issuer().as_deref(), Some("KNOXSSO"));
    assert_eq!(token.expires().as_deref(), Some("1363215090"));
    assert_eq!(token.signature(), b"sig");
    assert_eq!(token.to_wire(), wire);
    assert!(JwtToken::parse("only.two").is_err());
}

proptest! {
    #[test]
    fn prop_unknown_names_resolve_to_themselves(name in "[A-Za-z0-9_.-]{1,24}") {
        prop_assume!(name != "test-service");
        let env = test_environment();
        let ctx = RewriteContext::default();

        for mut processor in all_processors() {
            processor.initialize(Some(&env), None).unwrap();
            prop_assert_eq!(processor.resolve(&ctx, Some(&name)), Some(name.clone()));
        }
    }
}
