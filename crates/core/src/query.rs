use crate::DeviceReading;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use tokio::process::Command;
use tracing::{debug, warn};

/// PowerShell pipeline that enumerates Bluetooth PnP devices and reads the
/// vendor battery property, serialized as JSON. A single matching device
/// collapses to a bare object instead of a one-element array; the parser
/// handles both shapes.
const QUERY_SCRIPT: &str = r#"
Get-PnpDevice -Class 'Bluetooth' | ForEach-Object {
    $dev = $_
    $bat = Get-PnpDeviceProperty -KeyName '{104EA319-6EE2-4701-BD47-8DDBF425BBE5} 2' -InstanceId $dev.InstanceId -ErrorAction SilentlyContinue
    if ($bat) {
        @{ Name = $dev.FriendlyName; Battery = $bat.Data }
    }
} | ConvertTo-Json
"#;

/// Source of device readings. One call per poll cycle; a failed call is
/// reported as an empty list, never an error.
pub trait DeviceQuery: Send + Sync {
    fn query(&self) -> Pin<Box<dyn Future<Output = Vec<DeviceReading>> + Send + '_>>;
}

/// Queries the OS PnP subsystem through an external PowerShell invocation.
pub struct PnpDeviceQuery {
    program: String,
}

impl PnpDeviceQuery {
    pub fn new() -> Self {
        Self {
            program: "powershell".to_string(),
        }
    }

    /// Override the spawned program. Used by tests to simulate spawn failure.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_query(&self) -> Vec<DeviceReading> {
        let mut command = Command::new(&self.program);
        command.arg("-NoProfile").arg("-Command").arg(QUERY_SCRIPT);

        // Keep the spawned shell from flashing a console window.
        #[cfg(windows)]
        command.creation_flags(0x08000000); // CREATE_NO_WINDOW

        let output = match command.output().await {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to spawn device query: {}", e);
                return Vec::new();
            }
        };

        if !output.status.success() {
            warn!("Device query exited with {}", output.status);
            return Vec::new();
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let readings = parse_readings(&stdout);
        debug!("Device query returned {} readings", readings.len());
        readings
    }
}

impl Default for PnpDeviceQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceQuery for PnpDeviceQuery {
    fn query(&self) -> Pin<Box<dyn Future<Output = Vec<DeviceReading>> + Send + '_>> {
        Box::pin(self.run_query())
    }
}

#[derive(Debug, Deserialize)]
struct RawReading {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Battery")]
    battery: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueryPayload {
    Many(Vec<RawReading>),
    One(RawReading),
}

/// Parses the JSON emitted by the query command into a normalized list.
/// Empty or malformed input yields an empty list; the single-object shape
/// from `ConvertTo-Json` is wrapped so the ambiguity never leaves the
/// adapter.
pub fn parse_readings(raw: &str) -> Vec<DeviceReading> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let payload: QueryPayload = match serde_json::from_str(trimmed) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Unparseable device query output: {}", e);
            return Vec::new();
        }
    };

    let raw_readings = match payload {
        QueryPayload::Many(readings) => readings,
        QueryPayload::One(reading) => vec![reading],
    };

    raw_readings
        .into_iter()
        .map(|raw| DeviceReading {
            name: raw.name.unwrap_or_default(),
            level: raw.battery.as_ref().and_then(normalize_level),
        })
        .collect()
}

/// A usable battery value is an integer in 0..=100; anything else is
/// treated as "no battery property".
fn normalize_level(value: &serde_json::Value) -> Option<u8> {
    value
        .as_u64()
        .and_then(|v| u8::try_from(v).ok())
        .filter(|level| *level <= 100)
}
