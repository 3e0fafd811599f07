//! # junos-netconf
//!
//! ```toml
//! junos-netconf = "^0.1.0"
//! ```
//!
//! NETCONF over SSH client for Junos devices. A [`Device`] owns the
//! connection parameters and a single [`Session`]; RPC commands are passed
//! either as XML text or as a pre-built [`Element`] and the reply payload
//! comes back as an element tree.
//!
//! ## Example
//!
//! ```rust,no_run
//! use junos_netconf::{ConnectParams, Device};
//!
//! # async fn run() -> junos_netconf::error::NetconfClientResult<()> {
//! let params = ConnectParams::new("r1", "admin").password("secret");
//! let mut device = Device::new(params);
//! device.connect().await?;
//!
//! let reply = device.execute("<get-interface-information/>").await?;
//! for interface in reply.find_all("physical-interface") {
//!     println!("{:?}", interface.find_text("name"));
//! }
//!
//! device.close().await?;
//! # Ok(())
//! # }
//! ```
//!
pub mod codec;
pub mod device;
pub mod error;
pub mod framer;
pub mod message;
pub mod operation;
pub mod params;
pub mod recorder;
pub mod session;
pub mod transport;
pub mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::RpcPayload;
pub use device::Device;
pub use params::{ConnectParams, HostKeyVerification};
pub use session::{Session, SessionState};
pub use xml::Element;

pub const NETCONF_URN: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const NETCONF_BASE_10_CAP: &str = "urn:ietf:params:netconf:base:1.0";
pub const NETCONF_BASE_11_CAP: &str = "urn:ietf:params:netconf:base:1.1";
pub const NETCONF_PORT: u16 = 830;
