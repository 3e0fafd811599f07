use crate::error::NetconfClientResult;
use async_trait::async_trait;

pub mod async_framer;

pub const NETCONF_1_0_TERMINATOR: &str = "]]>]]>";

/// Largest chunk size allowed by RFC 6242 section 4.2.
pub const MAX_CHUNK_SIZE: u64 = 4_294_967_295;

/// Trait for NETCONF framer
#[async_trait]
pub trait Framer: Send {
    async fn upgrade(&mut self);
    async fn read_async(&mut self) -> NetconfClientResult<String>;
    async fn write_async(&mut self, rpc: &str) -> NetconfClientResult<()>;
}
