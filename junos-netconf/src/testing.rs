//! In-process NETCONF peer for exercising sessions without a device.

use crate::error::NetconfClientError;
use crate::framer::async_framer::AsyncFramer;
use crate::framer::{Framer, NETCONF_1_0_TERMINATOR};
use crate::transport::stream::StreamTransport;
use crate::xml::Element;
use crate::{NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP, NETCONF_URN};
use std::io;
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

pub(crate) struct FakeDevice {
    framer: AsyncFramer<DuplexStream>,
}

pub(crate) fn device_pair() -> (StreamTransport<DuplexStream>, FakeDevice) {
    let (client, server) = duplex(64 * 1024);
    (
        StreamTransport::new(client),
        FakeDevice {
            framer: AsyncFramer::new(server),
        },
    )
}

impl FakeDevice {
    pub(crate) const SESSION_ID: u64 = 42;

    pub(crate) async fn receive(&mut self) -> String {
        self.framer.read_async().await.unwrap()
    }

    pub(crate) async fn send(&mut self, xml: &str) {
        self.framer.write_async(xml).await.unwrap()
    }

    /// Sends raw bytes as one end-of-message framed message.
    pub(crate) async fn send_bytes(&mut self, bytes: &[u8]) {
        assert!(!self.framer.is_upgraded());
        let channel = self.framer.get_mut();
        channel.write_all(bytes).await.unwrap();
        channel
            .write_all(NETCONF_1_0_TERMINATOR.as_bytes())
            .await
            .unwrap();
        channel.flush().await.unwrap();
    }

    /// Whether the client has shut down its side of the channel.
    pub(crate) async fn closed_by_peer(&mut self) -> bool {
        match self.framer.read_async().await {
            Err(NetconfClientError::Io(err)) => err.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }

    /// Answers the client hello and returns it.
    pub(crate) async fn hello(&mut self, base_11: bool) -> String {
        let client_hello = self.receive().await;
        let mut capabilities = format!("<capability>{}</capability>", NETCONF_BASE_10_CAP);
        if base_11 {
            capabilities.push_str(&format!("<capability>{}</capability>", NETCONF_BASE_11_CAP));
        }
        capabilities.push_str("<capability>http://xml.juniper.net/netconf/junos/1.0</capability>");
        let hello = format!(
            "<hello xmlns=\"{}\"><capabilities>{}</capabilities><session-id>{}</session-id></hello>",
            NETCONF_URN,
            capabilities,
            FakeDevice::SESSION_ID
        );
        self.send(&hello).await;
        if base_11 {
            self.framer.upgrade().await;
        }
        client_hello
    }

    /// Waits for the next `<rpc>` and returns its message-id and operation.
    pub(crate) async fn next_rpc(&mut self) -> (u64, Element) {
        let rpc: Element = self.receive().await.parse().unwrap();
        assert_eq!(rpc.name(), "rpc");
        let message_id = rpc.attribute("message-id").unwrap().parse().unwrap();
        let operation = rpc.into_children().next().unwrap();
        (message_id, operation)
    }

    pub(crate) async fn reply(&mut self, message_id: u64, body: &str) {
        let reply = format!(
            "<rpc-reply message-id=\"{}\" xmlns=\"{}\">{}</rpc-reply>",
            message_id, NETCONF_URN, body
        );
        self.send(&reply).await;
    }
}
