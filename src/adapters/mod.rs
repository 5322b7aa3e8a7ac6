//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `credentials`  | CredentialStore    | NVS / in-memory blob         |
//! | `device_id`    | (identity source)  | eFuse factory MAC            |
//! | `log_sink`     | EventSink          | Serial log output            |
//! | `mqtt`         | MqttTransport      | ESP-IDF MQTT / loopback      |
//! | `provisioning` | ProvisioningPort   | Soft-AP + credential signal  |
//! | `time`         | DelayNs            | FreeRTOS / std sleep         |
//! | `wifi`         | StationPort        | ESP-IDF WiFi STA             |

pub mod credentials;
pub mod device_id;
pub mod log_sink;
pub mod mqtt;
pub mod provisioning;
pub mod time;
pub(super) mod utils;
pub mod wifi;
