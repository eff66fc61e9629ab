//! End-to-end orchestration tests against scripted collaborators
//!
//! The provider and the remote transport are replaced by their test doubles;
//! everything in between (project resolution, key registration, device
//! creation, readiness, upload, install, suites, teardown) is the real
//! pipeline.

use netperf_fleet::keys::KeyPair;
use netperf_fleet::logging::Logger;
use netperf_fleet::models::{NetworkScope, Protocol, RunConfig, SuiteKind};
use netperf_fleet::orchestrator::Orchestrator;
use netperf_fleet::provider::{DeviceRecord, InMemoryApi, IpAddressRecord};
use netperf_fleet::transport::ScriptedExecutor;

const SOURCE_HOST: &str = "198.51.100.1";
const TARGET_HOST: &str = "198.51.100.2";

fn test_key() -> KeyPair {
    KeyPair {
        private_key_path: "keys".into(),
        public_key: "ssh-ed25519 AAAA fleet@test".to_string(),
        provider_id: None,
    }
}

fn test_config(suites: &[&str], scopes: &[NetworkScope]) -> RunConfig {
    RunConfig {
        protocols: vec![Protocol::Tcp],
        sizes: vec![300],
        suites: suites.iter().map(|s| s.parse().unwrap()).collect(),
        scopes: scopes.to_vec(),
        class_tiers: vec![1],
        check_delay_secs: 0,
        api_token: "test-token".to_string(),
        ..RunConfig::default()
    }
}

fn seeded_record(id: &str, hostname: &str, octet: u8) -> DeviceRecord {
    DeviceRecord {
        id: id.to_string(),
        hostname: hostname.to_string(),
        state: "active".to_string(),
        ip_addresses: vec![
            IpAddressRecord {
                address: format!("198.51.100.{}", octet),
                public: true,
                address_family: 4,
            },
            IpAddressRecord {
                address: format!("10.99.0.{}", octet),
                public: false,
                address_family: 4,
            },
        ],
    }
}

/// Provider with the tier-1 pair already provisioned and active
fn seeded_api() -> InMemoryApi {
    let api = InMemoryApi::new();
    api.seed_device(seeded_record("dev-s1", "source1", 1));
    api.seed_device(seeded_record("dev-t1", "target1", 2));
    api
}

/// Executor scripted for clean metal and container suites
fn scripted_executor() -> ScriptedExecutor {
    let executor = ScriptedExecutor::new();
    executor.set_stdout_rule(TARGET_HOST, ">/dev/null && pgrep netserver", "4211\n");
    executor.set_stdout_rule(TARGET_HOST, "docker inspect", "172.17.0.2\n");
    executor.set_stdout_rule(SOURCE_HOST, "netperf -P 0 -H", "RT_LATENCY=120\n");
    executor.set_stdout_rule(TARGET_HOST, "netperf -P 0 -H", "RT_LATENCY=98\n");
    executor
}

#[tokio::test]
async fn full_run_accumulates_results_and_tears_down() {
    let api = seeded_api();
    let executor = scripted_executor();
    let config = test_config(&["metal", "bridge"], &[NetworkScope::Local, NetworkScope::Remote]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    assert!(report.is_success(), "unexpected error: {:?}", report.error);
    assert_eq!(report.exit_code(), 0);

    // 1 protocol x 1 size x 2 scopes x 1 target, for each of the two suites
    assert_eq!(report.results.len(), 4);
    let suites: Vec<String> = report
        .results
        .iter()
        .map(|r| r.case.suite.to_string())
        .collect();
    assert_eq!(suites, vec!["metal", "metal", "bridge", "bridge"]);
    assert_eq!(report.results[0].case.scope, NetworkScope::Local);
    assert_eq!(report.results[1].case.scope, NetworkScope::Remote);
    assert!(report.results.iter().all(|r| r.results.contains("RT_LATENCY")));

    // scripts and software landed on both devices before any suite ran
    let uploads = executor.upload_calls();
    assert_eq!(uploads.len(), 2);
    for host in [SOURCE_HOST, TARGET_HOST] {
        let commands = executor.commands_for(host);
        assert!(commands.iter().any(|c| c.contains("installnetperf.sh")));
        assert!(commands.iter().any(|c| c.contains("docker build -t netperf")));
    }

    // reflector lifecycle on the target only: metal start/stop, bridge start/stop
    let target_commands = executor.commands_for(TARGET_HOST);
    assert!(target_commands.iter().any(|c| c.contains("pgrep netserver")));
    assert!(target_commands.iter().any(|c| c == "pkill netserver"));
    assert!(target_commands.iter().any(|c| c.contains("--net=bridge -d --name=netserver")));
    assert!(target_commands
        .iter()
        .any(|c| c.contains("docker stop netserver")));

    // teardown destroyed devices, then project, then the registered key
    let calls = api.calls();
    assert!(calls.contains(&"delete_device dev-s1".to_string()));
    assert!(calls.contains(&"delete_device dev-t1".to_string()));
    let project_delete = calls.iter().position(|c| c.starts_with("delete_project"));
    let key_delete = calls.iter().position(|c| c.starts_with("delete_ssh_key"));
    assert!(project_delete.is_some());
    assert!(key_delete.is_some());
    assert!(project_delete < key_delete);
}

#[tokio::test]
async fn devices_are_created_when_missing() {
    let api = InMemoryApi::new();
    let executor = ScriptedExecutor::new();
    let config = test_config(&["metal"], &[NetworkScope::Local]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    assert!(report.is_success(), "unexpected error: {:?}", report.error);
    assert_eq!(report.results.len(), 1);

    let calls = api.calls();
    assert!(calls.iter().any(|c| c.ends_with("source1") && c.starts_with("create_device")));
    assert!(calls.iter().any(|c| c.ends_with("target1") && c.starts_with("create_device")));
    // both created devices were destroyed again
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("delete_device")).count(),
        2
    );
    assert!(api.devices().is_empty());
}

#[tokio::test]
async fn container_suite_failure_continues_with_later_suites() {
    let api = seeded_api();
    let executor = scripted_executor();
    // the bridge reflector container refuses to start
    executor.set_exit_code_rule(TARGET_HOST, "--net=bridge -d --name=netserver", 1);

    let config = test_config(&["bridge", "host"], &[NetworkScope::Local, NetworkScope::Remote]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    // the run failed, but the host suite still produced its results
    let error = report.error.as_ref().expect("run should report the bridge failure");
    assert!(error.to_string().contains("bridge"));
    assert_eq!(report.results.len(), 2);
    assert!(report
        .results
        .iter()
        .all(|r| r.case.suite == SuiteKind::Container("host".to_string())));

    // stop was never attempted for the suite whose start failed
    let stops = executor
        .commands_for(TARGET_HOST)
        .iter()
        .filter(|c| c.contains("docker stop netserver"))
        .count();
    assert_eq!(stops, 1);

    // a failed suite does not block teardown
    assert!(api.calls().iter().any(|c| c.starts_with("delete_device")));
}

#[tokio::test]
async fn metal_suite_failure_aborts_container_suites() {
    let api = seeded_api();
    // no success rules here: the metal reflector must fail to start
    let executor = ScriptedExecutor::new();
    executor.set_exit_code_rule(TARGET_HOST, ">/dev/null && pgrep netserver", 1);

    let config = test_config(&["metal", "bridge"], &[NetworkScope::Local]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    assert!(report.error.is_some());
    assert!(report.results.is_empty());

    // neither a metal stop nor any container work happened
    let target_commands = executor.commands_for(TARGET_HOST);
    assert!(!target_commands.iter().any(|c| c == "pkill netserver"));
    assert!(!target_commands.iter().any(|c| c.contains("--net=")));

    // suites finished (by failing), so the fleet is still torn down
    assert!(api.calls().iter().any(|c| c.starts_with("delete_device")));
}

#[tokio::test]
async fn benchmark_failure_still_stops_reflectors() {
    let api = seeded_api();
    let executor = ScriptedExecutor::new();
    executor.set_stdout_rule(TARGET_HOST, ">/dev/null && pgrep netserver", "4211\n");
    // every netperf invocation on the source host fails
    executor.set_exit_code_rule(SOURCE_HOST, "netperf -P 0 -H", 1);

    let config = test_config(&["metal"], &[NetworkScope::Remote]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    assert!(report.error.is_some());
    assert!(report.results.is_empty());

    // the reflector that was started got its stop despite the failed run
    let target_commands = executor.commands_for(TARGET_HOST);
    assert!(target_commands.iter().any(|c| c.contains("pgrep netserver")));
    assert!(target_commands.iter().any(|c| c == "pkill netserver"));
}

#[tokio::test]
async fn install_failure_aborts_before_any_suite() {
    let api = seeded_api();
    let executor = ScriptedExecutor::new();
    executor.set_exit_code_rule(SOURCE_HOST, "installdocker.sh", 1);

    let config = test_config(&["metal"], &[NetworkScope::Local]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    let error = report.error.expect("install failure should fail the run");
    assert_eq!(error.category(), "AGGREGATE");
    assert!(error.to_string().contains("source1"));
    assert!(report.results.is_empty());

    // the chained session short-circuited: no image build after the failure
    let source_commands = executor.commands_for(SOURCE_HOST);
    assert!(!source_commands.iter().any(|c| c.contains("docker build")));
    // the sibling device still ran its full chain independently
    let target_commands = executor.commands_for(TARGET_HOST);
    assert!(target_commands.iter().any(|c| c.contains("docker build")));

    // provisioning never finished, so nothing was benchmarked or destroyed
    assert!(!executor
        .exec_calls()
        .iter()
        .any(|(_, c)| c.contains("netperf -P 0")));
    assert!(!api.calls().iter().any(|c| c.starts_with("delete_device")));
}

#[tokio::test]
async fn keep_flag_skips_teardown() {
    let api = seeded_api();
    let executor = scripted_executor();
    let mut config = test_config(&["metal"], &[NetworkScope::Local]);
    config.keep_resources = true;
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    assert!(report.is_success(), "unexpected error: {:?}", report.error);
    let calls = api.calls();
    assert!(!calls.iter().any(|c| c.starts_with("delete_device")));
    assert!(!calls.iter().any(|c| c.starts_with("delete_project")));
    assert!(!calls.iter().any(|c| c.starts_with("delete_ssh_key")));
}

#[tokio::test]
async fn device_removal_failure_preserves_project_and_key() {
    let api = seeded_api();
    api.fail_delete_device("dev-t1");
    let executor = scripted_executor();
    let config = test_config(&["metal"], &[NetworkScope::Local]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    // teardown errors are logged, they do not change the run status
    assert!(report.is_success(), "unexpected error: {:?}", report.error);

    let calls = api.calls();
    assert!(calls.iter().any(|c| c.starts_with("delete_device")));
    assert!(!calls.iter().any(|c| c.starts_with("delete_project")));
    assert!(!calls.iter().any(|c| c.starts_with("delete_ssh_key")));
}

#[tokio::test]
async fn existing_project_is_reused_not_created() {
    let api = seeded_api();
    api.seed_project("proj-existing", "previous run");
    let executor = scripted_executor();
    let mut config = test_config(&["metal"], &[NetworkScope::Local]);
    config.project_id = Some("proj-existing".to_string());
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    assert!(report.is_success(), "unexpected error: {:?}", report.error);
    let calls = api.calls();
    assert!(calls.contains(&"get_project proj-existing".to_string()));
    assert!(!calls.iter().any(|c| c == "create_project"));
}

#[tokio::test]
async fn missing_project_fails_before_any_device_work() {
    let api = seeded_api();
    let executor = scripted_executor();
    let mut config = test_config(&["metal"], &[NetworkScope::Local]);
    config.project_id = Some("proj-gone".to_string());
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    let error = report.error.expect("missing project should fail the run");
    assert_eq!(error.category(), "RESOURCE");
    assert!(report.results.is_empty());
    assert!(executor.exec_calls().is_empty());
}

#[tokio::test]
async fn registered_key_is_reused_by_public_key_match() {
    let api = seeded_api();
    api.seed_ssh_key(netperf_fleet::provider::SshKeyRecord {
        id: "key-77".to_string(),
        label: "earlier run".to_string(),
        key: "ssh-ed25519 AAAA fleet@test".to_string(),
    });
    let executor = scripted_executor();
    let config = test_config(&["metal"], &[NetworkScope::Local]);
    let logger = Logger::default();

    let report = Orchestrator::new(&api, &executor, &config, test_key(), &logger)
        .run()
        .await;

    assert!(report.is_success(), "unexpected error: {:?}", report.error);
    let calls = api.calls();
    assert!(!calls.iter().any(|c| c == "add_ssh_key"));
    // the matched key is the one removed at teardown
    assert!(calls.contains(&"delete_ssh_key key-77".to_string()));
}
