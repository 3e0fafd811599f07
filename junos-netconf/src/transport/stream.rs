use crate::error::NetconfClientResult;
use crate::framer::async_framer::AsyncFramer;
use crate::framer::Framer;
use crate::transport::Transport;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// NETCONF over an already established byte stream.
pub struct StreamTransport<S> {
    framer: AsyncFramer<S>,
    closed: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> StreamTransport<S> {
    pub fn new(stream: S) -> StreamTransport<S> {
        StreamTransport {
            framer: AsyncFramer::new(stream),
            closed: false,
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> Transport for StreamTransport<S> {
    async fn receive(&mut self) -> NetconfClientResult<String> {
        self.framer.read_async().await
    }

    async fn write(&mut self, rpc: &str) -> NetconfClientResult<()> {
        self.framer.write_async(rpc).await
    }

    async fn close(&mut self) -> NetconfClientResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.framer.get_mut().shutdown().await?;
        Ok(())
    }

    async fn upgrade(&mut self) {
        self.framer.upgrade().await;
    }
}
