//! Reflector lifecycle management
//!
//! Starts and stops the server-role netserver process on every distinct
//! target device of a suite. Both operations fan out in parallel with
//! independent per-device outcomes and join at an all-or-nothing barrier:
//! start fails the suite if any device fails (without undoing the others,
//! that is the orchestrator's cleanup), stop attempts every device and
//! reports the failures it collected.

use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{DeviceSet, ReflectorHandle};
use crate::transport::RemoteExecutor;
use futures::future::join_all;
use std::collections::BTreeMap;

/// Address used when the resolve command reports no address for a reflector
pub const LOOPBACK_FALLBACK: &str = "localhost";

/// Start a reflector on each target device.
///
/// `start_command` must print the process/container identifier. When
/// `resolve_command` is given it runs on the same device and its output is
/// the address clients dial (empty output falls back to the loopback
/// sentinel); without it the device's private address is used.
pub async fn start_reflectors(
    executor: &dyn RemoteExecutor,
    devices: &DeviceSet,
    targets: &[String],
    start_command: &str,
    resolve_command: Option<&str>,
    logger: &Logger,
) -> Result<BTreeMap<String, ReflectorHandle>> {
    let tasks = targets.iter().map(|name| async move {
        let outcome = start_one(executor, devices, name, start_command, resolve_command).await;
        (name.clone(), outcome)
    });

    let mut handles = BTreeMap::new();
    let mut failures = Vec::new();
    for (name, outcome) in join_all(tasks).await {
        match outcome {
            Ok(handle) => {
                logger.device(&name, &format!("netserver started {}", handle.reflector_id));
                handles.insert(name, handle);
            }
            Err(e) => {
                logger.error(&format!("{}: failed to start netserver: {}", name, e));
                failures.push(format!("{}: {}", name, e));
            }
        }
    }

    if failures.is_empty() {
        Ok(handles)
    } else {
        Err(AppError::aggregate_messages("start reflectors", failures))
    }
}

async fn start_one(
    executor: &dyn RemoteExecutor,
    devices: &DeviceSet,
    name: &str,
    start_command: &str,
    resolve_command: Option<&str>,
) -> Result<ReflectorHandle> {
    let device = devices.require(name)?;
    let host = device.public_addr()?;

    let output = executor.exec_checked(host, start_command).await?;
    let reflector_id = output.trim().to_string();

    let addr = match resolve_command {
        Some(command) => {
            let resolved = executor.exec_checked(host, command).await?;
            let resolved = resolved.trim();
            if resolved.is_empty() {
                LOOPBACK_FALLBACK.to_string()
            } else {
                resolved.to_string()
            }
        }
        None => device.private_addr()?.to_string(),
    };

    Ok(ReflectorHandle {
        device: name.to_string(),
        reflector_id,
        addr,
    })
}

/// Stop the reflectors recorded in `handles`.
///
/// Every device gets its stop attempt; failures are collected and joined
/// into one aggregate error after the fan-out completes.
pub async fn stop_reflectors(
    executor: &dyn RemoteExecutor,
    devices: &DeviceSet,
    handles: &BTreeMap<String, ReflectorHandle>,
    stop_command: &str,
    logger: &Logger,
) -> Result<()> {
    let tasks = handles.values().map(|handle| async move {
        let outcome = stop_one(executor, devices, handle, stop_command).await;
        (handle, outcome)
    });

    let mut failures = Vec::new();
    for (handle, outcome) in join_all(tasks).await {
        match outcome {
            Ok(()) => {
                logger.device(&handle.device, &format!("netserver stopped {}", handle.reflector_id));
            }
            Err(e) => {
                logger.error(&format!(
                    "{}: failed to stop netserver {}: {}",
                    handle.device, handle.reflector_id, e
                ));
                failures.push(format!("{}: {}", handle.device, e));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(AppError::aggregate_messages("stop reflectors", failures))
    }
}

async fn stop_one(
    executor: &dyn RemoteExecutor,
    devices: &DeviceSet,
    handle: &ReflectorHandle,
    stop_command: &str,
) -> Result<()> {
    let device = devices.require(&handle.device)?;
    let host = device.public_addr()?;
    executor.exec_checked(host, stop_command).await?;
    Ok(())
}
