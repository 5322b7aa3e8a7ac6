//! Shared utilities for adapter-layer validation.
//!
//! Used by the Wi-Fi station (before joining) and the provisioning
//! adapter (before accepting submitted credentials).

use super::wifi::ConnectivityError;
use crate::app::ports::Credentials;

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// SSID: 1-32 printable ASCII bytes.
pub(super) fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

/// Password: empty (open network) or 8-64 bytes (WPA2).
pub(super) fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

pub(super) fn validate_credentials(credentials: &Credentials) -> Result<(), ConnectivityError> {
    validate_ssid(&credentials.ssid)?;
    validate_password(&credentials.password)
}
