//! Benchmark execution
//!
//! Runs the generated cases against live reflectors, strictly one at a time
//! and in generator order. Concurrent execution is disallowed: simultaneous
//! benchmarks sharing a link would corrupt each other's measurements. The
//! series aborts at the first failing case, since later cases depend on the
//! same reflector state being undisturbed.

use crate::defaults;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{BenchmarkResult, DeviceSet, NetworkScope, ReflectorHandle, TestCase};
use crate::transport::RemoteExecutor;
use std::collections::BTreeMap;

/// Build the netperf invocation for one case.
///
/// `command_prefix` routes the client through a container runtime when the
/// suite needs it; bare-metal suites pass an empty prefix.
pub fn benchmark_command(case: &TestCase, dial_addr: &str, command_prefix: &str) -> String {
    format!(
        "{}netperf -P 0 -H {} -c -t {}_RR -l -{} -v 2 -p {} -- -k -r {},{} -P {},{}",
        command_prefix,
        dial_addr,
        case.protocol,
        case.repetitions,
        case.port,
        case.size,
        case.size,
        defaults::NETSERVER_LOCAL_PORT,
        defaults::NETSERVER_DATA_PORT,
    )
}

/// Address the benchmark client dials for one case
fn dial_address(
    case: &TestCase,
    devices: &DeviceSet,
    handles: &BTreeMap<String, ReflectorHandle>,
) -> Result<String> {
    match case.scope {
        // across machines the reflector is reached on the target's fabric
        // address, whatever network mode it runs in
        NetworkScope::Remote => Ok(devices.require(&case.to)?.private_addr()?.to_string()),
        NetworkScope::Local => handles
            .get(&case.to)
            .map(|handle| handle.addr.clone())
            .ok_or_else(|| AppError::internal(format!("no reflector handle for {}", case.to))),
    }
}

/// Execute the case series against the live reflector map.
///
/// Results come back in case order; the first transport or command failure
/// aborts the rest of the series and names the failing case.
pub async fn run_cases(
    executor: &dyn RemoteExecutor,
    devices: &DeviceSet,
    handles: &BTreeMap<String, ReflectorHandle>,
    cases: &[TestCase],
    message_prefix: &str,
    command_prefix: &str,
    logger: &Logger,
) -> Result<Vec<BenchmarkResult>> {
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        let label = format!("{} {}", message_prefix, case.label());
        logger.device(&case.from, &format!("running {}", label));

        let dial_addr = dial_address(case, devices, handles)?;
        let source_host = devices.require(&case.from)?.public_addr()?;
        let command = benchmark_command(case, &dial_addr, command_prefix);

        match executor.exec_checked(source_host, &command).await {
            Ok(output) => {
                logger.device(&case.from, &format!("test complete: {}", label));
                results.push(BenchmarkResult {
                    case: case.clone(),
                    results: output,
                });
            }
            Err(e) => {
                logger.error(&format!("{}: failed {}: {}", case.from, label, e));
                return Err(AppError::suite(format!("{}: {} failed: {}", case.from, label, e)));
            }
        }
    }

    Ok(results)
}
