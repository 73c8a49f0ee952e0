//! Serial Port Discovery

use crate::error::ObdError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A serial device visible to the operating system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Device path (e.g., "/dev/ttyUSB0" or "COM3")
    pub device: String,
}

/// Enumerates candidate adapter ports
///
/// Enumeration may block on the OS; call it from a blocking context.
pub trait PortLister: Send + Sync {
    /// List the ports currently visible
    fn list_ports(&self) -> Result<Vec<PortInfo>, ObdError>;
}

/// Lists the serial ports reported by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortLister;

impl PortLister for SerialPortLister {
    fn list_ports(&self) -> Result<Vec<PortInfo>, ObdError> {
        let ports = tokio_serial::available_ports()?;
        debug!("OS reported {} serial ports", ports.len());
        Ok(ports
            .into_iter()
            .map(|port| PortInfo {
                device: port.port_name,
            })
            .collect())
    }
}

/// Returns a fixed list of ports (simulated vehicles, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticPortLister {
    devices: Vec<String>,
}

impl StaticPortLister {
    /// Create a lister that always reports `devices`
    pub fn new<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            devices: devices.into_iter().map(Into::into).collect(),
        }
    }
}

impl PortLister for StaticPortLister {
    fn list_ports(&self) -> Result<Vec<PortInfo>, ObdError> {
        Ok(self
            .devices
            .iter()
            .map(|device| PortInfo {
                device: device.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lister_preserves_order() {
        let lister = StaticPortLister::new(["/dev/ttyUSB1", "/dev/ttyUSB0"]);
        let devices: Vec<_> = lister
            .list_ports()
            .unwrap()
            .into_iter()
            .map(|p| p.device)
            .collect();
        assert_eq!(devices, vec!["/dev/ttyUSB1", "/dev/ttyUSB0"]);
    }

    #[test]
    fn test_empty_static_lister() {
        assert!(StaticPortLister::default().list_ports().unwrap().is_empty());
    }
}
