//! Soft-AP provisioning adapter.
//!
//! Implements [`ProvisioningPort`].  `provision()` raises the fixed
//! setup access point, then blocks until credentials are submitted
//! through [`submit_credentials`] or the portal timeout elapses.
//!
//! The submission side (the setup page's request handler on the device,
//! a test harness on the host) only touches [`PORTAL_CREDENTIALS`], a
//! single-slot `embassy_sync` signal; a newer submission overwrites an
//! unread one.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: switches the shared Wi-Fi driver into
//!   access-point mode for the duration of the wait.
//! - **all other targets**: no radio; only the wait loop runs.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::utils::{validate_password, validate_ssid};
use super::wifi::ConnectivityError;
use crate::app::ports::{Credentials, ProvisioningOutcome, ProvisioningPort};
use crate::config::NodeConfig;

#[cfg(target_os = "espidf")]
use super::wifi::SharedWifi;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod, Configuration};

/// Credentials handed from the setup page to the waiting provisioner.
pub static PORTAL_CREDENTIALS: Signal<CriticalSectionRawMutex, Credentials> = Signal::new();

/// How often the wait loop checks for a submission.
const POLL_INTERVAL_MS: u32 = 250;

/// Validate and hand over operator-entered credentials.
pub fn submit_credentials(ssid: &str, password: &str) -> Result<(), ConnectivityError> {
    validate_ssid(ssid)?;
    validate_password(password)?;
    let credentials = Credentials::new(ssid, password).ok_or(ConnectivityError::InvalidPassword)?;
    info!("provisioning: credentials submitted for '{}'", credentials.ssid);
    PORTAL_CREDENTIALS.signal(credentials);
    Ok(())
}

pub struct SoftApProvisioner<D> {
    #[cfg(target_os = "espidf")]
    wifi: SharedWifi,
    ssid: heapless::String<32>,
    password: heapless::String<32>,
    timeout_ms: u32,
    delay: D,
}

impl<D: DelayNs> SoftApProvisioner<D> {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: SharedWifi, config: &NodeConfig, delay: D) -> Self {
        Self {
            wifi,
            ssid: config.portal_ssid.clone(),
            password: config.portal_password.clone(),
            timeout_ms: config.portal_timeout_secs.saturating_mul(1000),
            delay,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(config: &NodeConfig, delay: D) -> Self {
        Self {
            ssid: config.portal_ssid.clone(),
            password: config.portal_password.clone(),
            timeout_ms: config.portal_timeout_secs.saturating_mul(1000),
            delay,
        }
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Poll the signal until a submission arrives or the timeout elapses.
    fn wait_for_credentials(&mut self) -> Option<Credentials> {
        let mut waited_ms = 0u32;
        loop {
            if let Some(credentials) = PORTAL_CREDENTIALS.try_take() {
                return Some(credentials);
            }
            if waited_ms >= self.timeout_ms {
                return None;
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
            waited_ms = waited_ms.saturating_add(POLL_INTERVAL_MS);
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn open_access_point(&mut self) -> bool {
        let Ok(mut wifi) = self.wifi.lock() else {
            return false;
        };
        let (Ok(ssid), Ok(password)) = (self.ssid.as_str().try_into(), self.password.as_str().try_into()) else {
            warn!("provisioning: portal SSID/passphrase do not fit the driver config");
            return false;
        };
        let config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid,
            password,
            auth_method: AuthMethod::WPA2Personal,
            channel: 1,
            ..Default::default()
        });
        if wifi.is_started().unwrap_or(false) {
            let _ = wifi.stop();
        }
        let result = wifi
            .set_configuration(&config)
            .and_then(|()| wifi.start())
            .and_then(|()| wifi.wait_netif_up());
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("provisioning: access point failed ({})", e);
                false
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn open_access_point(&mut self) -> bool {
        true
    }

    #[cfg(target_os = "espidf")]
    fn close_access_point(&mut self) {
        if let Ok(mut wifi) = self.wifi.lock() {
            let _ = wifi.stop();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn close_access_point(&mut self) {}
}

impl<D: DelayNs> ProvisioningPort for SoftApProvisioner<D> {
    fn provision(&mut self) -> ProvisioningOutcome {
        if !self.open_access_point() {
            return ProvisioningOutcome::Failed;
        }
        info!(
            "provisioning: access point '{}' up, waiting up to {} s",
            self.ssid,
            self.timeout_ms / 1000
        );

        let outcome = match self.wait_for_credentials() {
            Some(credentials) => ProvisioningOutcome::Provisioned(credentials),
            None => {
                warn!("provisioning: no credentials before timeout");
                ProvisioningOutcome::Failed
            }
        };
        self.close_access_point();
        outcome
    }
}
