//! Test matrix generation
//!
//! Pure transformation from a run configuration to the ordered list of
//! benchmark cases. Nested iteration order is protocol, then size, then
//! network scope, then target device, each in the order the input
//! collections were given, so two runs over the same configuration always
//! execute the same cases in the same order.

use crate::error::Result;
use crate::models::{DeviceSet, NetworkScope, Protocol, SuiteKind, TestCase};

/// Inputs for one suite's test matrix
#[derive(Debug, Clone)]
pub struct MatrixParams<'a> {
    /// Suite the generated cases belong to
    pub suite: SuiteKind,
    pub protocols: &'a [Protocol],
    pub sizes: &'a [u32],
    pub scopes: &'a [NetworkScope],
    /// Active device set; targets are taken from it, sources resolved
    /// through its pairing rule
    pub devices: &'a DeviceSet,
    /// netserver control port
    pub port: u16,
    /// Repetitions per benchmark invocation
    pub repetitions: u32,
}

/// Generate the ordered benchmark case list for one suite.
///
/// `local` scope pairs a target with itself; `remote` scope pairs it with
/// its validated source counterpart. A device set that cannot pair a target
/// fails the whole generation.
pub fn generate_matrix(params: &MatrixParams<'_>) -> Result<Vec<TestCase>> {
    let targets = params.devices.targets();
    let mut cases =
        Vec::with_capacity(params.protocols.len() * params.sizes.len() * params.scopes.len() * targets.len());

    for protocol in params.protocols {
        for &size in params.sizes {
            for scope in params.scopes {
                for target in &targets {
                    let from = match scope {
                        NetworkScope::Local => target.name.clone(),
                        NetworkScope::Remote => {
                            params.devices.source_counterpart(target)?.name.clone()
                        }
                    };
                    cases.push(TestCase {
                        suite: params.suite.clone(),
                        scope: *scope,
                        from,
                        to: target.name.clone(),
                        port: params.port,
                        repetitions: params.repetitions,
                        size,
                        protocol: *protocol,
                    });
                }
            }
        }
    }

    Ok(cases)
}

/// Distinct target device names of a case list, first-use order preserved
pub fn distinct_targets(cases: &[TestCase]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for case in cases {
        if !targets.iter().any(|t| t == &case.to) {
            targets.push(case.to.clone());
        }
    }
    targets
}
