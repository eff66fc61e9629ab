//! Run orchestration
//!
//! Sequences one complete benchmark run: resolve the project, register the
//! ssh key, create missing devices, wait for readiness, upload scripts,
//! install software, run the requested suites, tear the fleet down. The
//! orchestrator owns the active device set and the result accumulator;
//! components return new data and never mutate shared state.
//!
//! Failure policy: provisioning phases abort at the first error. Suite
//! execution continues to the next containerized suite after one fails (a
//! deliberate exception, so one broken network mode does not discard a day
//! of fleet time), while a metal-suite failure aborts the remaining suites.
//! Teardown errors are logged but never displace the run error.

use crate::error::{AppError, Result};
use crate::keys::KeyPair;
use crate::logging::Logger;
use crate::matrix::{distinct_targets, generate_matrix, MatrixParams};
use crate::models::{
    BenchmarkResult, DeviceSet, ProvisionState, RunConfig, SuiteKind, TestCase,
};
use crate::provider::{DeviceCreate, ResourceApi};
use crate::reflector::{start_reflectors, stop_reflectors};
use crate::runner::run_cases;
use crate::transport::RemoteExecutor;
use crate::{defaults, poller::ReadinessPoller};
use chrono::Utc;
use futures::future::join_all;

/// Outcome of a run: everything measured plus the terminal status
#[derive(Debug)]
pub struct RunReport {
    /// Accumulated results in execution order, possibly incomplete
    pub results: Vec<BenchmarkResult>,
    /// Terminal error, if any phase or suite failed
    pub error: Option<AppError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map(AppError::exit_code).unwrap_or(0)
    }
}

/// Drives one benchmark run end to end
pub struct Orchestrator<'a> {
    api: &'a dyn ResourceApi,
    executor: &'a dyn RemoteExecutor,
    config: &'a RunConfig,
    logger: &'a Logger,
    key: KeyPair,
    project_name: String,
    project_id: Option<String>,
    devices: DeviceSet,
    results: Vec<BenchmarkResult>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        api: &'a dyn ResourceApi,
        executor: &'a dyn RemoteExecutor,
        config: &'a RunConfig,
        key: KeyPair,
        logger: &'a Logger,
    ) -> Self {
        let project_name = format!("{}-{}", defaults::PROJECT_PREFIX, Utc::now().to_rfc3339());
        Self {
            api,
            executor,
            config,
            logger,
            key,
            project_name,
            project_id: config.project_id.clone(),
            devices: config.active_devices(),
            results: Vec::new(),
        }
    }

    /// Execute the full pipeline and return everything it produced.
    ///
    /// Teardown runs whenever provisioning completed, regardless of suite
    /// outcomes; the accumulated results survive any failure.
    pub async fn run(mut self) -> RunReport {
        self.log_selections();

        let mut error = self.provision().await.err();
        if error.is_none() {
            error = self.execute_suites().await.err();
            self.teardown().await;
        }

        self.logger.info("test run complete");
        RunReport {
            results: self.results,
            error,
        }
    }

    fn log_selections(&self) {
        self.logger
            .info(&format!("using devices: {}", self.devices.names().join(" ")));
        let sizes: Vec<String> = self.config.sizes.iter().map(u32::to_string).collect();
        self.logger
            .info(&format!("using packet sizes: {}", sizes.join(" ")));
        let protocols: Vec<String> =
            self.config.protocols.iter().map(|p| p.to_string()).collect();
        self.logger
            .info(&format!("using protocols: {}", protocols.join(" ")));
        let suites: Vec<String> = self.config.suites.iter().map(|s| s.to_string()).collect();
        self.logger.info(&format!("using tests: {}", suites.join(" ")));
        let scopes: Vec<String> = self.config.scopes.iter().map(|s| s.to_string()).collect();
        self.logger
            .info(&format!("using network tests: {}", scopes.join(" ")));
    }

    // Provisioning phases, each gated on the previous one

    async fn provision(&mut self) -> Result<()> {
        self.resolve_project().await?;
        self.register_ssh_key().await?;
        self.create_devices().await?;
        self.wait_ready().await?;
        self.upload_scripts().await?;
        self.install_software().await?;
        Ok(())
    }

    async fn resolve_project(&mut self) -> Result<()> {
        let requested = self.project_id.clone();
        match requested {
            Some(id) => {
                self.logger.info("reusing existing project");
                let project = self.api.get_project(&id).await.map_err(|e| {
                    self.logger
                        .error(&format!("cannot use project {} which does not exist", id));
                    e
                })?;
                self.project_id = Some(project.id);
            }
            None => {
                self.logger.info("creating new project");
                let project = self.api.create_project(&self.project_name).await?;
                self.project_id = Some(project.id);
            }
        }
        self.logger
            .info(&format!("project ready: {}", self.project_id().unwrap_or("?")));
        Ok(())
    }

    fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    async fn register_ssh_key(&mut self) -> Result<()> {
        let keys = self.api.list_ssh_keys().await?;
        if let Some(existing) = keys.iter().find(|k| k.key == self.key.public_key) {
            self.key.provider_id = Some(existing.id.clone());
            self.logger
                .info(&format!("ssh key already in system: {}", existing.id));
            return Ok(());
        }

        self.logger.info("key not in system, adding");
        let label = format!("temporary key for {}", self.project_name);
        let record = self
            .api
            .add_ssh_key(&label, &self.key.public_key)
            .await
            .map_err(|e| {
                self.logger.error("failed to install ssh public key");
                e
            })?;
        self.logger.info(&format!("installed ssh key {}", record.id));
        self.key.provider_id = Some(record.id);
        Ok(())
    }

    async fn create_devices(&mut self) -> Result<()> {
        let project_id = self.require_project()?.to_string();

        self.logger.info("checking existing devices");
        let existing = self.api.list_devices(&project_id).await?;

        let mut to_create = Vec::new();
        for name in self.devices.names() {
            match existing.iter().find(|r| r.hostname == name) {
                Some(record) => {
                    self.logger.device(&name, "already exists");
                    if let Some(device) = self.devices.get_mut(&name) {
                        device.id = Some(record.id.clone());
                        device.state = ProvisionState::Creating;
                    }
                }
                None => to_create.push(name),
            }
        }

        self.logger.info("making new devices if needed");
        let api = self.api;
        let logger = self.logger;
        let config = self.config;
        let requests: Vec<(String, DeviceCreate)> = to_create
            .iter()
            .map(|name| {
                let tier = self.devices.get(name).map(|d| d.class_tier).unwrap_or(0);
                (
                    name.clone(),
                    DeviceCreate {
                        hostname: name.clone(),
                        plan: format!("baremetal_{}", tier),
                        facility: config.facility.clone(),
                        operating_system: config.operating_system.clone(),
                    },
                )
            })
            .collect();

        let tasks = requests.iter().map(|(name, request)| {
            let project_id = project_id.clone();
            async move {
                logger.info(&format!("creating {}", name));
                (name.clone(), api.create_device(&project_id, request).await)
            }
        });

        let mut failures = Vec::new();
        for (name, outcome) in join_all(tasks).await {
            match outcome {
                Ok(record) => {
                    self.logger.device(&name, "created");
                    if let Some(device) = self.devices.get_mut(&name) {
                        device.id = Some(record.id);
                        device.state = ProvisionState::Creating;
                    }
                }
                Err(e) => {
                    self.logger.error(&format!("{}: error creating: {}", name, e));
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        if failures.is_empty() {
            self.logger.info("all devices created");
            Ok(())
        } else {
            Err(AppError::aggregate_messages("create devices", failures))
        }
    }

    async fn wait_ready(&mut self) -> Result<()> {
        let project_id = self.require_project()?.to_string();
        self.logger.info("waiting for all devices to be ready");
        let poller = ReadinessPoller::new(self.api, self.logger, self.config.check_delay());
        poller.wait_ready(&project_id, &mut self.devices).await
    }

    async fn upload_scripts(&self) -> Result<()> {
        self.logger.info("uploading scripts");
        let executor = self.executor;
        let scripts_dir = &self.config.scripts_dir;

        let tasks = self.devices.iter().map(|device| async move {
            let outcome = match device.public_addr() {
                Ok(host) => {
                    executor
                        .upload(host, scripts_dir, defaults::REMOTE_SCRIPTS_PATH)
                        .await
                }
                Err(e) => Err(e),
            };
            (device.name.clone(), outcome)
        });

        let mut failures = Vec::new();
        for (name, outcome) in join_all(tasks).await {
            match outcome {
                Ok(()) => self.logger.device(&name, "successfully uploaded scripts"),
                Err(e) => {
                    self.logger.error(&format!("{}: failed to upload scripts: {}", name, e));
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        if failures.is_empty() {
            self.logger.info("scripts uploaded to all devices");
            Ok(())
        } else {
            Err(AppError::aggregate_messages("upload scripts", failures))
        }
    }

    async fn install_software(&self) -> Result<()> {
        self.logger.info("installing software");
        let executor = self.executor;
        let commands: Vec<String> = defaults::INSTALL_COMMANDS
            .iter()
            .map(|c| c.to_string())
            .collect();

        let tasks = self.devices.iter().map(|device| {
            let commands = commands.clone();
            async move {
                let outcome = match device.public_addr() {
                    Ok(host) => executor.run_sequence(host, &commands).await,
                    Err(e) => Err(e),
                };
                (device.name.clone(), outcome)
            }
        });

        let mut failures = Vec::new();
        for (name, outcome) in join_all(tasks).await {
            match outcome {
                Ok(()) => self.logger.device(&name, "complete"),
                Err(e) => {
                    self.logger.error(&format!("{}: error installing software: {}", name, e));
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        if failures.is_empty() {
            self.logger.info("software installed on all devices");
            Ok(())
        } else {
            Err(AppError::aggregate_messages("install software", failures))
        }
    }

    // Suite execution

    async fn execute_suites(&mut self) -> Result<()> {
        if self.config.metal_requested() {
            self.logger.info("running metal tests");
            if let Err(e) = self.run_one_suite(SuiteKind::Metal).await {
                self.logger.error(&format!("metal tests failed: {}", e));
                return Err(e);
            }
            self.logger.info("metal tests complete");
        } else {
            self.logger.info("skipping metal tests");
        }

        let container_suites: Vec<SuiteKind> =
            self.config.container_suites().into_iter().cloned().collect();

        let mut failures = Vec::new();
        for suite in container_suites {
            self.logger.info(&format!("running net={} tests", suite));
            match self.run_one_suite(suite.clone()).await {
                Ok(()) => self.logger.info(&format!("net={} complete", suite)),
                Err(e) => {
                    self.logger.error(&format!("net={} errors: {}", suite, e));
                    failures.push(format!("{}: {}", suite, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::aggregate_messages("container suites", failures))
        }
    }

    /// Generate and execute one suite, appending whatever it produced
    async fn run_one_suite(&mut self, suite: SuiteKind) -> Result<()> {
        let cases = generate_matrix(&MatrixParams {
            suite: suite.clone(),
            protocols: &self.config.protocols,
            sizes: &self.config.sizes,
            scopes: &self.config.scopes,
            devices: &self.devices,
            port: self.config.port,
            repetitions: self.config.repetitions,
        })?;

        let (mut results, error) = match &suite {
            SuiteKind::Metal => {
                let start = format!(
                    "netserver -p {} >/dev/null && pgrep netserver",
                    self.config.port
                );
                self.run_suite(&cases, &start, None, "pkill netserver", "benchmark", "")
                    .await
            }
            SuiteKind::Container(mode) => {
                let netarg = format!("--net={}", mode);
                let portline = format!(
                    "-p {port}:{port} -p {data}:{data} -p {data}:{data}/udp",
                    port = self.config.port,
                    data = defaults::NETSERVER_DATA_PORT,
                );
                let start = format!(
                    "docker run {} {} -d --name=netserver netperf netserver -D -p {}",
                    portline, netarg, self.config.port
                );
                let resolve = "docker inspect --format '{{ .NetworkSettings.IPAddress }}' netserver";
                let prefix = format!("docker run --rm {} netperf ", netarg);
                self.run_suite(
                    &cases,
                    &start,
                    Some(resolve),
                    "docker stop netserver && docker rm netserver",
                    "container",
                    &prefix,
                )
                .await
            }
        };

        self.results.append(&mut results);
        match error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// One suite's reflector lifecycle around its serial case run.
    ///
    /// Stop targets exactly the handles start produced: it is skipped when
    /// start failed and always attempted once start succeeded, even if the
    /// run itself failed. Results measured before a failure are returned
    /// alongside the error instead of being discarded.
    async fn run_suite(
        &self,
        cases: &[TestCase],
        start_command: &str,
        resolve_command: Option<&str>,
        stop_command: &str,
        message_prefix: &str,
        command_prefix: &str,
    ) -> (Vec<BenchmarkResult>, Option<AppError>) {
        let targets = distinct_targets(cases);

        let handles = match start_reflectors(
            self.executor,
            &self.devices,
            &targets,
            start_command,
            resolve_command,
            self.logger,
        )
        .await
        {
            Ok(handles) => handles,
            Err(e) => return (Vec::new(), Some(e)),
        };

        let run_outcome = run_cases(
            self.executor,
            &self.devices,
            &handles,
            cases,
            message_prefix,
            command_prefix,
            self.logger,
        )
        .await;

        let stop_outcome = stop_reflectors(
            self.executor,
            &self.devices,
            &handles,
            stop_command,
            self.logger,
        )
        .await;

        match (run_outcome, stop_outcome) {
            (Ok(results), Ok(())) => (results, None),
            (Ok(results), Err(e)) => (results, Some(e)),
            (Err(e), _) => (Vec::new(), Some(e)),
        }
    }

    // Teardown

    async fn teardown(&mut self) {
        if self.config.keep_resources {
            self.logger.info("command-line flag not to destroy devices");
            return;
        }

        self.logger.info("destroying devices");
        let api = self.api;
        let created: Vec<(String, String)> = self
            .devices
            .iter()
            .filter_map(|d| d.id.clone().map(|id| (d.name.clone(), id)))
            .collect();

        let tasks = created.iter().map(|(name, id)| async move {
            (name.clone(), api.delete_device(id).await)
        });

        let mut all_removed = true;
        for (name, outcome) in join_all(tasks).await {
            match outcome {
                Ok(()) => {
                    self.logger.device(&name, "removed");
                    if let Some(device) = self.devices.get_mut(&name) {
                        device.id = None;
                    }
                }
                Err(e) => {
                    all_removed = false;
                    self.logger
                        .error(&format!("{}: removal failed, please check console: {}", name, e));
                }
            }
        }

        if !all_removed {
            self.logger.error(
                "err destroying devices, check the provider console to avoid unnecessary charges",
            );
            self.logger.info("not destroying project as devices not destroyed");
            return;
        }
        self.logger.info("all devices destroyed");

        let project_destroyed = match self.project_id() {
            Some(id) => {
                self.logger.info("destroying project");
                match self.api.delete_project(id).await {
                    Ok(()) => {
                        self.logger.info(&format!("project {} destroyed", id));
                        true
                    }
                    Err(e) => {
                        self.logger.error(&format!(
                            "err destroying project {}, please check console: {}",
                            id, e
                        ));
                        false
                    }
                }
            }
            None => false,
        };

        if !project_destroyed {
            self.logger.info("not removing ssh key as project not destroyed");
            return;
        }

        if let Some(key_id) = self.key.provider_id.clone() {
            self.logger.info("removing ssh key");
            match self.api.delete_ssh_key(&key_id).await {
                Ok(()) => self.logger.info(&format!("ssh key {} removed", key_id)),
                Err(e) => self.logger.error(&format!(
                    "err removing ssh key {}, please check console: {}",
                    key_id, e
                )),
            }
        }
    }

    fn require_project(&self) -> Result<&str> {
        self.project_id()
            .ok_or_else(|| AppError::internal("no project id resolved"))
    }
}
