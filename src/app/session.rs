//! Network session: owns the wireless link and the Node Identity.
//!
//! `connect()` decides between the stored credentials and the provisioning
//! fallback:
//!
//! ```text
//!   reset input asserted ──▶ erase store ─┐
//!   store empty ──────────────────────────┼──▶ provisioning ──▶ join ──▶ save
//!   stored credentials ──▶ join (retry policy) ──▶ Connected
//! ```
//!
//! The identity becomes available only after a successful join and does
//! not change afterwards.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::ports::{CredentialStore, Credentials, NetworkPort, ProvisioningOutcome, ProvisioningPort, StationPort};
use super::retry::RetryPolicy;
use super::topics::Identity;
use crate::error::{Error, Result};

pub struct NetworkSession<S, P, C, R, D> {
    station: S,
    provisioner: P,
    store: C,
    retry: R,
    delay: D,
    reset_requested: bool,
    identity: Option<Identity>,
}

impl<S, P, C, R, D> NetworkSession<S, P, C, R, D>
where
    S: StationPort,
    P: ProvisioningPort,
    C: CredentialStore,
    R: RetryPolicy,
    D: DelayNs,
{
    /// `reset_requested` is the boot-reset input level sampled at boot.
    pub fn new(station: S, provisioner: P, store: C, retry: R, delay: D, reset_requested: bool) -> Self {
        Self {
            station,
            provisioner,
            store,
            retry,
            delay,
            reset_requested,
            identity: None,
        }
    }

    pub fn station(&self) -> &S {
        &self.station
    }

    pub fn station_mut(&mut self) -> &mut S {
        &mut self.station
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Join with stored credentials, retrying per policy.
    fn join_stored(&mut self, credentials: &Credentials) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.station.join(credentials) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("session: join '{}' failed (attempt {}): {}", credentials.ssid, attempt, e);
                    match self.retry.next_delay_ms(attempt) {
                        Some(ms) => self.delay.delay_ms(ms),
                        None => return Err(Error::LinkUnavailable),
                    }
                }
            }
        }
    }

    /// Run the provisioning fallback and persist what it yields.
    fn provision(&mut self) -> Result<()> {
        info!("session: starting provisioning fallback");
        let credentials = match self.provisioner.provision() {
            ProvisioningOutcome::Provisioned(c) => c,
            ProvisioningOutcome::Failed => {
                warn!("session: provisioning failed");
                return Err(Error::Provisioning);
            }
        };
        self.station.join(&credentials).map_err(|e| {
            warn!("session: provisioned credentials rejected: {}", e);
            Error::Provisioning
        })?;
        if let Err(e) = self.store.save(&credentials) {
            warn!("session: credentials not persisted: {}", e);
        }
        Ok(())
    }
}

impl<S, P, C, R, D> NetworkPort for NetworkSession<S, P, C, R, D>
where
    S: StationPort,
    P: ProvisioningPort,
    C: CredentialStore,
    R: RetryPolicy,
    D: DelayNs,
{
    fn connect(&mut self) -> Result<()> {
        if self.station.is_connected() && self.identity.is_some() {
            return Ok(());
        }

        if self.reset_requested {
            info!("session: boot-reset asserted, erasing stored credentials");
            self.reset_requested = false;
            if let Err(e) = self.store.erase() {
                warn!("session: credential erase failed: {}", e);
            }
        }

        match self.store.load() {
            Some(credentials) => self.join_stored(&credentials)?,
            None => self.provision()?,
        }

        if self.identity.is_none() {
            self.identity = Some(self.station.hostname());
        }
        info!(
            "session: link up as '{}' (RSSI={:?})",
            self.identity.as_deref().unwrap_or_default(),
            self.station.rssi()
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.station.is_connected()
    }

    fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    fn signal_quality(&self) -> Option<i8> {
        if self.station.is_connected() {
            self.station.rssi()
        } else {
            None
        }
    }
}
