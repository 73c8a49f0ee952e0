//! OBD-II Adapter Contract
//!
//! Describes what the dashboard needs from an OBD-II adapter library without
//! implementing the wire protocol itself. An adapter library plugs in through
//! [`Connector`] and [`ObdConnection`]; serial port discovery goes through
//! [`PortLister`].

mod command;
mod connection;
mod error;
pub mod mock;
mod ports;
mod response;
mod status;

pub use command::Command;
pub use connection::{Connector, ObdConnection, SampleCallback};
pub use error::ObdError;
pub use ports::{PortInfo, PortLister, SerialPortLister, StaticPortLister};
pub use response::{Response, Value};
pub use status::ObdStatus;
