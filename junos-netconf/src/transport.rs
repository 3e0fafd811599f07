use crate::error::NetconfClientResult;
use async_trait::async_trait;

#[cfg(feature = "async-ssh2-lite")]
pub mod ssh;
pub mod stream;

/// Trait for NETCONF transport
///
/// A transport carries whole NETCONF messages; framing is its concern, the
/// content is not. `close` must be safe to call more than once.
#[async_trait]
pub trait Transport: Send {
    async fn receive(&mut self) -> NetconfClientResult<String>;
    async fn write(&mut self, rpc: &str) -> NetconfClientResult<()>;
    async fn write_and_receive(&mut self, rpc: &str) -> NetconfClientResult<String> {
        self.write(rpc).await?;
        self.receive().await
    }
    async fn close(&mut self) -> NetconfClientResult<()>;
    async fn upgrade(&mut self);
}
