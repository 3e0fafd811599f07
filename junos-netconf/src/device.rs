use crate::codec::RpcPayload;
use crate::error::{NetconfClientError, NetconfClientResult};
use crate::operation::{Datastore, Filter, RpcOperation, WithDefaultsValue};
use crate::params::ConnectParams;
use crate::recorder::{FileRecorder, Recorder};
use crate::session::Session;
use crate::transport::Transport;
use crate::xml::Element;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A Junos device reachable over NETCONF.
///
/// Holds the connection parameters and at most one open [`Session`]. All
/// operations take `&mut self`; share a `Device` between tasks behind a
/// mutex of your own.
pub struct Device {
    params: ConnectParams,
    session: Option<Session>,
    recorder: Option<Arc<dyn Recorder>>,
    rpc_timeout: Option<Duration>,
}

impl Device {
    pub fn new(params: ConnectParams) -> Device {
        Device {
            params,
            session: None,
            recorder: None,
            rpc_timeout: None,
        }
    }

    pub fn hostname(&self) -> &str {
        self.params.host()
    }

    pub fn user(&self) -> &str {
        self.params.user()
    }

    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    /// Used by the next `connect`; an open session is not affected.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.params.set_password(password);
    }

    /// Deadline for each RPC round trip, `None` to wait indefinitely.
    pub fn set_timeout(&mut self, rpc_timeout: Option<Duration>) {
        self.rpc_timeout = rpc_timeout;
        if let Some(session) = self.session.as_mut() {
            session.set_timeout(rpc_timeout);
        }
    }

    pub fn set_recorder(&mut self, recorder: Option<Arc<dyn Recorder>>) {
        self.recorder = recorder.clone();
        if let Some(session) = self.session.as_mut() {
            session.set_recorder(recorder);
        }
    }

    /// Appends every message exchanged with the device to `path`.
    pub fn log_to_file(&mut self, path: impl AsRef<Path>) -> NetconfClientResult<()> {
        let recorder = FileRecorder::create(path)?;
        self.set_recorder(Some(Arc::new(recorder)));
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.as_ref().map_or(false, Session::is_open)
    }

    #[cfg(feature = "async-ssh2-lite")]
    pub async fn connect(&mut self) -> NetconfClientResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.params.validate()?;
        let transport = crate::transport::ssh::SSHTransport::connect(&self.params).await?;
        self.open_session(transport).await
    }

    /// Opens a session over a transport the caller already established.
    pub async fn connect_with<T>(&mut self, transport: T) -> NetconfClientResult<()>
    where
        T: Transport + 'static,
    {
        if self.is_connected() {
            return Ok(());
        }
        self.params.validate()?;
        self.open_session(transport).await
    }

    async fn open_session<T>(&mut self, transport: T) -> NetconfClientResult<()>
    where
        T: Transport + 'static,
    {
        let mut session = Session::new(transport);
        session.set_timeout(self.rpc_timeout);
        session.set_recorder(self.recorder.clone());
        session.open().await?;
        debug!(
            target: &self.params.address(),
            "Connected, session-id {:?}",
            session.session_id()
        );
        self.session = Some(session);
        Ok(())
    }

    /// Sends one RPC command and returns the payload of its reply.
    ///
    /// `command` is the operation element without the `<rpc>` envelope,
    /// either as XML text or as an [`Element`].
    pub async fn execute(&mut self, command: impl Into<RpcPayload>) -> NetconfClientResult<Element> {
        let session = self.open_session_mut()?;
        let payload = command.into().into_element()?;
        let reply = session.request(&payload).await?;
        Ok(reply.into_payload())
    }

    pub async fn get_config(
        &mut self,
        source: Datastore,
        filter: Option<Filter>,
        with_defaults: Option<WithDefaultsValue>,
    ) -> NetconfClientResult<Element> {
        self.execute(RpcOperation::new_get_config(source, filter, with_defaults))
            .await
    }

    pub async fn get(
        &mut self,
        filter: Option<Filter>,
        with_defaults: Option<WithDefaultsValue>,
    ) -> NetconfClientResult<Element> {
        self.execute(RpcOperation::new_get(filter, with_defaults))
            .await
    }

    pub async fn validate(&mut self, source: Datastore) -> NetconfClientResult<Element> {
        self.execute(RpcOperation::Validate { source }).await
    }

    pub async fn commit(&mut self) -> NetconfClientResult<Element> {
        self.execute(RpcOperation::new_commit(false, None, None, None))
            .await
    }

    /// Commit that the device rolls back unless confirmed within
    /// `confirm_timeout` seconds (device default 600).
    pub async fn confirmed_commit(
        &mut self,
        confirm_timeout: Option<u32>,
    ) -> NetconfClientResult<Element> {
        self.execute(RpcOperation::new_commit(true, confirm_timeout, None, None))
            .await
    }

    pub async fn kill_session(&mut self, session_id: u64) -> NetconfClientResult<Element> {
        self.execute(RpcOperation::KillSession { session_id }).await
    }

    pub fn session_id(&self) -> Option<u64> {
        self.session.as_ref().and_then(Session::session_id)
    }

    pub fn server_capabilities(&self) -> Vec<String> {
        self.session
            .as_ref()
            .map(|session| session.server_capabilities().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Kept for callers of the old API; templates are rendered elsewhere.
    pub fn template(&self, filename: &str) -> bool {
        debug!("Template {} accepted", filename);
        true
    }

    /// Ends the session. Safe to call when never connected or already closed.
    pub async fn close(&mut self) -> NetconfClientResult<()> {
        match self.session.take() {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }

    fn open_session_mut(&mut self) -> NetconfClientResult<&mut Session> {
        match self.session.as_mut() {
            Some(session) if session.is_open() => Ok(session),
            _ => Err(NetconfClientError::NotConnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::tests::MemoryRecorder;
    use crate::recorder::Direction;
    use crate::testing::device_pair;
    use pretty_assertions::assert_eq;

    const INTERFACES: &str = "<interface-information><physical-interface><name>ge-0/0/0</name><oper-status>up</oper-status></physical-interface><physical-interface><name>ge-0/0/1</name><oper-status>down</oper-status></physical-interface></interface-information>";

    fn r1() -> Device {
        Device::new(ConnectParams::new("r1", "admin").password("x"))
    }

    #[tokio::test]
    async fn test_execute_returns_reply_payload() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(false).await;
            let (message_id, operation) = peer.next_rpc().await;
            assert_eq!(message_id, 1);
            assert_eq!(operation.name(), "get-interface-information");
            peer.reply(message_id, INTERFACES).await;
            let (message_id, operation) = peer.next_rpc().await;
            assert_eq!(operation.name(), "close-session");
            peer.reply(message_id, "<ok/>").await;
        });

        let mut device = r1();
        assert_eq!(device.hostname(), "r1");
        assert_eq!(device.user(), "admin");
        device.connect_with(transport).await.unwrap();
        assert!(device.is_connected());
        assert_eq!(device.session_id(), Some(42));

        let reply = device
            .execute("<get-interface-information/>")
            .await
            .unwrap();
        assert_eq!(reply.name(), "interface-information");
        let names: Vec<String> = reply
            .find_all("physical-interface")
            .filter_map(|interface| interface.find_text("name"))
            .collect();
        assert_eq!(names, vec!["ge-0/0/0", "ge-0/0/1"]);

        device.close().await.unwrap();
        assert!(!device.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_before_connect() {
        let mut device = r1();
        assert!(matches!(
            device.execute("<get-software-information/>").await,
            Err(NetconfClientError::NotConnected)
        ));
        device.close().await.unwrap();
        device.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_requires_host_and_user() {
        let (transport, _peer) = device_pair();
        let mut device = Device::new(ConnectParams::new("r1", ""));
        assert!(matches!(
            device.connect_with(transport).await,
            Err(NetconfClientError::MissingCredentials("user"))
        ));
        assert!(!device.is_connected());
    }

    #[tokio::test]
    async fn test_invalid_payload_keeps_session_open() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(false).await;
            let (message_id, operation) = peer.next_rpc().await;
            assert_eq!(operation.name(), "get-software-information");
            peer.reply(message_id, "<software-information/>").await;
        });

        let mut device = r1();
        device.connect_with(transport).await.unwrap();
        assert!(matches!(
            device.execute("<get-software-information>").await,
            Err(NetconfClientError::InvalidPayload(_))
        ));
        assert!(matches!(
            device.execute(vec![0xffu8, 0xfe]).await,
            Err(NetconfClientError::InvalidPayload(_))
        ));
        assert!(device.is_connected());

        let reply = device
            .execute(Element::new("get-software-information"))
            .await
            .unwrap();
        assert_eq!(reply.name(), "software-information");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rpc_error_keeps_session_open() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(true).await;
            let (message_id, _) = peer.next_rpc().await;
            peer.reply(
                message_id,
                "<rpc-error><error-type>application</error-type><error-tag>invalid-value</error-tag><error-severity>error</error-severity><error-path>/configuration</error-path><error-message>unknown command</error-message></rpc-error>",
            )
            .await;
            let (message_id, _) = peer.next_rpc().await;
            peer.reply(
                message_id,
                "<rpc-error><error-severity>warning</error-severity><error-message>statement not found</error-message></rpc-error><ok/>",
            )
            .await;
        });

        let mut device = r1();
        device.connect_with(transport).await.unwrap();
        match device.execute("<get-bogus-information/>").await {
            Err(NetconfClientError::Device(errors)) => {
                let error = errors.iter().next().unwrap();
                assert_eq!(error.error_tag.as_deref(), Some("invalid-value"));
                assert_eq!(error.error_path.as_deref(), Some("/configuration"));
            }
            other => panic!("expected device error, got {:?}", other),
        }
        assert!(device.is_connected());

        let reply = device.commit().await.unwrap();
        assert_eq!(reply.name(), "ok");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fatal_error_disconnects() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(false).await;
            let (message_id, _) = peer.next_rpc().await;
            peer.reply(message_id + 7, "<ok/>").await;
            peer
        });

        let mut device = r1();
        device.connect_with(transport).await.unwrap();
        assert!(matches!(
            device.execute("<get-software-information/>").await,
            Err(NetconfClientError::Protocol { .. })
        ));
        assert!(!device.is_connected());
        assert!(matches!(
            device.execute("<get-software-information/>").await,
            Err(NetconfClientError::NotConnected)
        ));
        device.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_reply_disconnects() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(false).await;
            peer.next_rpc().await;
            peer.send("<rpc-reply message-id=\"1\"><unterminated>").await;
            peer
        });

        let mut device = r1();
        device.connect_with(transport).await.unwrap();
        assert!(matches!(
            device.execute("<get-software-information/>").await,
            Err(NetconfClientError::MalformedResponse(_))
        ));
        assert!(!device.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_disconnects() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(false).await;
            peer.next_rpc().await;
            peer
        });

        let mut device = r1();
        device.set_timeout(Some(Duration::from_millis(50)));
        device.connect_with(transport).await.unwrap();
        assert!(matches!(
            device.execute("<get-software-information/>").await,
            Err(NetconfClientError::Timeout(_))
        ));
        assert!(!device.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_negotiation_failure() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.receive().await;
            peer.send("<rpc-reply message-id=\"1\"><ok/></rpc-reply>").await;
            peer
        });

        let mut device = r1();
        assert!(matches!(
            device.connect_with(transport).await,
            Err(NetconfClientError::Negotiation(_))
        ));
        assert!(!device.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_builtin_operations() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(true).await;
            let mut operations = Vec::new();
            for _ in 0..4 {
                let (message_id, operation) = peer.next_rpc().await;
                operations.push(operation.to_string());
                peer.reply(message_id, "<data><configuration/></data>").await;
            }
            operations
        });

        let mut device = r1();
        device.connect_with(transport).await.unwrap();
        let filter = Filter::subtree("<configuration><system/></configuration>").unwrap();
        let reply = device
            .get_config(Datastore::Running, Some(filter), None)
            .await
            .unwrap();
        assert_eq!(reply.name(), "data");
        device.validate(Datastore::Candidate).await.unwrap();
        device.confirmed_commit(Some(300)).await.unwrap();
        device.kill_session(17).await.unwrap();

        let operations = server.await.unwrap();
        assert_eq!(
            operations,
            vec![
                "<get-config><source><running/></source><filter type=\"subtree\"><configuration><system/></configuration></filter></get-config>",
                "<validate><source><candidate/></source></validate>",
                "<commit><confirmed/><confirm-timeout>300</confirm-timeout></commit>",
                "<kill-session><session-id>17</session-id></kill-session>",
            ]
        );
    }

    #[tokio::test]
    async fn test_recorder_sees_exchange() {
        let (transport, mut peer) = device_pair();
        let server = tokio::spawn(async move {
            peer.hello(false).await;
            let (message_id, _) = peer.next_rpc().await;
            peer.reply(message_id, "<ok/>").await;
        });

        let recorder = Arc::new(MemoryRecorder::default());
        let mut device = r1();
        device.set_recorder(Some(recorder.clone()));
        device.connect_with(transport).await.unwrap();
        device.execute("<lock-configuration/>").await.unwrap();
        server.await.unwrap();

        let events = recorder.events.lock().unwrap();
        let directions: Vec<Direction> = events.iter().map(|event| event.0).collect();
        assert_eq!(
            directions,
            vec![
                Direction::Sent,
                Direction::Received,
                Direction::Sent,
                Direction::Received
            ]
        );
        assert!(events[3].2.contains("<ok/>"));
    }

    #[test]
    fn test_template_is_accepted() {
        assert!(r1().template("interfaces.conf"));
    }
}
