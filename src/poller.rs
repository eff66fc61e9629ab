//! Device readiness polling
//!
//! Drives the outstanding device set through the provider's provisioning
//! states until every device reports active. One listing call covers the
//! whole outstanding set per round; the poller only sleeps between rounds
//! while something is still outstanding, so a fleet that is active on the
//! first round completes without ever suspending.

use crate::error::Result;
use crate::logging::Logger;
use crate::models::{DeviceSet, ProvisionState};
use crate::provider::ResourceApi;
use std::time::Duration;

/// Polls the provider until every outstanding device is active
pub struct ReadinessPoller<'a> {
    api: &'a dyn ResourceApi,
    logger: &'a Logger,
    delay: Duration,
}

impl<'a> ReadinessPoller<'a> {
    pub fn new(api: &'a dyn ResourceApi, logger: &'a Logger, delay: Duration) -> Self {
        Self { api, logger, delay }
    }

    /// Wait until every device in the set is ready.
    ///
    /// A listing error fails the wait immediately: devices already marked
    /// ready keep their recorded addresses, the rest are moved to the
    /// aborted state and the error is returned as-is.
    pub async fn wait_ready(&self, project_id: &str, devices: &mut DeviceSet) -> Result<()> {
        for name in devices.outstanding() {
            if let Some(device) = devices.get_mut(&name) {
                device.state = ProvisionState::Polling;
            }
        }

        loop {
            let outstanding = devices.outstanding();
            if outstanding.is_empty() {
                self.logger.info("all devices ready");
                return Ok(());
            }

            self.logger.info(&format!("checking {}", outstanding.join(",")));
            let records = match self.api.list_devices(project_id).await {
                Ok(records) => records,
                Err(e) => {
                    self.logger.error("error retrieving device list");
                    for name in &outstanding {
                        if let Some(device) = devices.get_mut(name) {
                            device.state = ProvisionState::Aborted;
                        }
                    }
                    return Err(e);
                }
            };

            for name in &outstanding {
                let record = records.iter().find(|r| &r.hostname == name);
                if let Some(record) = record.filter(|r| r.is_active()) {
                    if let Some(device) = devices.get_mut(name) {
                        device.public_addr = record.public_ipv4().map(str::to_string);
                        device.private_addr = record.private_ipv4().map(str::to_string);
                        device.state = ProvisionState::Ready;
                        self.logger.device(name, "ready");
                    }
                }
            }

            if !devices.all_ready() {
                self.logger.info(&format!(
                    "waiting {} seconds to check devices",
                    self.delay.as_secs()
                ));
                tokio::time::sleep(self.delay).await;
            }
        }
    }
}
