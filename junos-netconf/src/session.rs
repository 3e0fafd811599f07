use crate::codec;
use crate::error::{NetconfClientError, NetconfClientResult};
use crate::message::{Hello, RpcReply};
use crate::operation::RpcOperation;
use crate::recorder::{Direction, Recorder, RpcEvent};
use crate::transport::Transport;
use crate::xml::Element;
use crate::{NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Wait for the `<close-session>` reply when no RPC timeout is set.
const CLOSE_SESSION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Negotiating,
    Open,
    Closed,
}

/// One NETCONF session over an exclusively owned transport.
///
/// Requests are strictly sequential: `request` takes `&mut self`, so a
/// second RPC cannot start while one is outstanding. Once closed a session
/// stays closed.
pub struct Session {
    transport: Box<dyn Transport + Send + 'static>,
    state: SessionState,
    next_message_id: u64,
    server_capabilities: BTreeSet<String>,
    session_id: Option<u64>,
    in_flight: bool,
    rpc_timeout: Option<Duration>,
    recorder: Option<Arc<dyn Recorder>>,
}

impl Session {
    pub fn new<T>(transport: T) -> Session
    where
        T: Transport + 'static,
    {
        Session {
            transport: Box::new(transport),
            state: SessionState::Disconnected,
            next_message_id: 1,
            server_capabilities: BTreeSet::new(),
            session_id: None,
            in_flight: false,
            rpc_timeout: None,
            recorder: None,
        }
    }

    /// Upper bound for the hello exchange and every RPC round trip.
    pub fn with_timeout(mut self, rpc_timeout: Duration) -> Session {
        self.rpc_timeout = Some(rpc_timeout);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Session {
        self.recorder = Some(recorder);
        self
    }

    pub fn set_timeout(&mut self, rpc_timeout: Option<Duration>) {
        self.rpc_timeout = rpc_timeout;
    }

    pub fn set_recorder(&mut self, recorder: Option<Arc<dyn Recorder>>) {
        self.recorder = recorder;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn session_id(&self) -> Option<u64> {
        self.session_id
    }

    pub fn server_capabilities(&self) -> impl Iterator<Item = &str> {
        self.server_capabilities.iter().map(String::as_str)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.server_capabilities.contains(capability)
    }

    /// Performs the hello exchange and moves the session to `Open`.
    pub async fn open(&mut self) -> NetconfClientResult<()> {
        if self.state != SessionState::Disconnected {
            return Err(NetconfClientError::Negotiation(format!(
                "session cannot be opened from state {:?}",
                self.state
            )));
        }
        self.state = SessionState::Negotiating;
        match self.hello().await {
            Ok(()) => {
                self.state = SessionState::Open;
                debug!(
                    "Session {} open, {} server capabilities",
                    self.session_id.unwrap_or(0),
                    self.server_capabilities.len()
                );
                Ok(())
            }
            Err(err) => {
                self.abort().await;
                Err(match err {
                    NetconfClientError::Negotiation(_) => err,
                    other => NetconfClientError::Negotiation(other.to_string()),
                })
            }
        }
    }

    async fn hello(&mut self) -> NetconfClientResult<()> {
        let hello = Hello::new().to_string();
        self.record(Direction::Sent, None, &hello);
        let response = self.exchange(&hello).await?;
        self.record(Direction::Received, None, &response);
        debug!("Hello:\n{}", response);

        let server = codec::decode_hello(&response)?;
        let base_11 = server.has_capability(NETCONF_BASE_11_CAP);
        if !base_11 && !server.has_capability(NETCONF_BASE_10_CAP) {
            return Err(NetconfClientError::Negotiation(
                "peer advertises no NETCONF base capability".to_string(),
            ));
        }
        if base_11 {
            self.transport.upgrade().await;
        }
        self.server_capabilities = server.capabilities().map(str::to_string).collect();
        self.session_id = server.session_id();
        Ok(())
    }

    /// Returns the next message-id. Ids are never handed out twice, even
    /// when the request using one fails.
    pub fn next_message_id(&mut self) -> u64 {
        let message_id = self.next_message_id;
        self.next_message_id += 1;
        message_id
    }

    /// Sends one RPC and waits for its reply.
    pub async fn request(&mut self, payload: &Element) -> NetconfClientResult<RpcReply> {
        if self.in_flight {
            warn!("Previous request was abandoned before its reply arrived, closing session");
            self.abort().await;
        }
        if self.state != SessionState::Open {
            return Err(NetconfClientError::NotConnected);
        }

        let message_id = self.next_message_id();
        let rpc = codec::encode(payload, message_id)?;
        self.record(Direction::Sent, Some(message_id), &rpc);
        debug!("RPC:\n{}", rpc);

        self.in_flight = true;
        let response = match self.exchange(&rpc).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err).await),
        };
        self.in_flight = false;
        self.record(Direction::Received, Some(message_id), &response);
        debug!("Reply:\n{}", response);

        let reply = match codec::decode(&response) {
            Ok(reply) => reply,
            Err(err) => return Err(self.fail(err).await),
        };
        if reply.message_id() != message_id {
            let err = NetconfClientError::Protocol {
                expected: message_id,
                actual: reply.message_id(),
            };
            return Err(self.fail(err).await);
        }
        reply.check()
    }

    /// Ends the session: `<close-session>` when open, then the transport is
    /// closed whatever the device answered.
    pub async fn close(&mut self) -> NetconfClientResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        if self.state == SessionState::Open && !self.in_flight {
            let close_session = RpcOperation::CloseSession.into_element();
            let limit = self.rpc_timeout.unwrap_or(CLOSE_SESSION_TIMEOUT);
            match timeout(limit, self.request(&close_session)).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => debug!("close-session was not acknowledged: {}", err),
                Err(_) => debug!("close-session was not answered within {:?}", limit),
            }
            if self.state == SessionState::Closed {
                return Ok(());
            }
        }
        self.state = SessionState::Closed;
        self.in_flight = false;
        self.transport.close().await
    }

    async fn exchange(&mut self, rpc: &str) -> NetconfClientResult<String> {
        match self.rpc_timeout {
            Some(limit) => match timeout(limit, self.transport.write_and_receive(rpc)).await {
                Ok(result) => result,
                Err(_) => Err(NetconfClientError::Timeout(limit)),
            },
            None => self.transport.write_and_receive(rpc).await,
        }
    }

    async fn fail(&mut self, err: NetconfClientError) -> NetconfClientError {
        if err.is_fatal() {
            warn!("Closing session after error: {}", err);
            self.abort().await;
        }
        self.in_flight = false;
        err
    }

    async fn abort(&mut self) {
        self.in_flight = false;
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Err(err) = self.transport.close().await {
            debug!("Error closing transport: {}", err);
        }
    }

    fn record(&self, direction: Direction, message_id: Option<u64>, xml: &str) {
        if let Some(recorder) = &self.recorder {
            recorder.record(&RpcEvent {
                direction,
                message_id,
                xml,
            });
        }
    }
}
