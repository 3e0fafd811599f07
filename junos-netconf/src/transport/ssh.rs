use crate::error::{NetconfClientError, NetconfClientResult};
use crate::framer::async_framer::AsyncFramer;
use crate::framer::Framer;
use crate::params::{ConnectParams, HostKeyVerification};
use crate::transport::Transport;
use async_ssh2_lite::ssh2::{CheckResult, KnownHostFileKind};
use async_ssh2_lite::{ssh2, AsyncChannel, AsyncSession, SessionConfiguration};
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SSHTransport {
    session: AsyncSession<TcpStream>,
    framer: AsyncFramer<AsyncChannel<TcpStream>>,
    closed: bool,
}

impl SSHTransport {
    pub async fn new_with_session(
        session: AsyncSession<TcpStream>,
    ) -> NetconfClientResult<SSHTransport> {
        connect_internal(session).await
    }

    /// Opens TCP and SSH to the device, verifies its host key, authenticates
    /// and starts the `netconf` subsystem.
    pub async fn connect(params: &ConnectParams) -> NetconfClientResult<SSHTransport> {
        let address = params.address();
        let stream = timeout(
            CONNECT_TIMEOUT,
            TcpStream::connect((params.host(), params.port_number())),
        )
        .await
        .map_err(|_| connection_error(&address, "connection timed out"))?
        .map_err(|err| connection_error(&address, err))?;
        debug!(target: &address, "Established connection");

        let mut configuration = SessionConfiguration::new();
        configuration.set_timeout(10_000);
        let mut session = AsyncSession::new(stream, configuration)
            .map_err(|err| connection_error(&address, err))?;
        session
            .handshake()
            .await
            .map_err(|err| connection_error(&address, err))?;

        verify_host_key(&session, params)?;
        authenticate(&mut session, params).await?;
        connect_internal(session).await
    }
}

#[async_trait]
impl Transport for SSHTransport {
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
        let channel = self.framer.get_mut();
        channel.send_eof().await?;
        channel.close().await?;
        channel.wait_close().await?;
        self.session
            .disconnect(Some(ssh2::ByApplication), "Shutdown", None)
            .await?;
        Ok(())
    }

    async fn upgrade(&mut self) {
        self.framer.upgrade().await;
    }
}

fn connection_error(address: &str, reason: impl ToString) -> NetconfClientError {
    NetconfClientError::Connection {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

fn verify_host_key(
    session: &AsyncSession<TcpStream>,
    params: &ConnectParams,
) -> NetconfClientResult<()> {
    let address = params.address();
    if params.verification() == HostKeyVerification::AcceptAny {
        warn!(target: &address, "Host key verification disabled");
        return Ok(());
    }

    let (key, _) = session
        .host_key()
        .ok_or_else(|| connection_error(&address, "server presented no host key"))?;
    let path = params
        .known_hosts_path()
        .ok_or_else(|| connection_error(&address, "no known_hosts file available"))?;
    let mut known_hosts = session
        .known_hosts()
        .map_err(|err| connection_error(&address, err))?;
    known_hosts
        .read_file(&path, KnownHostFileKind::OpenSSH)
        .map_err(|err| {
            connection_error(&address, format!("reading {}: {}", path.display(), err))
        })?;

    match known_hosts.check_port(params.host(), params.port_number(), key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => Err(connection_error(
            &address,
            format!("host key not found in {}", path.display()),
        )),
        CheckResult::Mismatch => Err(connection_error(
            &address,
            "host key does not match known_hosts entry",
        )),
        CheckResult::Failure => Err(connection_error(&address, "host key check failed")),
    }
}

async fn authenticate(
    session: &mut AsyncSession<TcpStream>,
    params: &ConnectParams,
) -> NetconfClientResult<()> {
    let address = params.address();
    let auth_error = |reason: String| NetconfClientError::Authentication {
        user: params.user().to_string(),
        reason,
    };

    if let Some(password) = params.secret() {
        session
            .userauth_password(params.user(), password)
            .await
            .map_err(|err| auth_error(err.to_string()))?;
    } else {
        let mut agent = session.agent().map_err(|err| auth_error(err.to_string()))?;
        agent
            .connect()
            .await
            .map_err(|err| auth_error(format!("ssh-agent unavailable: {}", err)))?;
        agent
            .list_identities()
            .await
            .map_err(|err| auth_error(err.to_string()))?;

        let identities = agent.identities().map_err(|err| auth_error(err.to_string()))?;
        for identity in identities {
            debug!(
                target: &address,
                "Trying authentication with public key '{}'",
                identity.comment()
            );
            match agent.userauth(params.user(), &identity).await {
                Ok(_) => break,
                Err(err) => {
                    warn!(
                        target: &address,
                        "Public key '{}' authentication failed: {}",
                        identity.comment(),
                        err
                    );
                    continue;
                }
            }
        }
    }

    if session.authenticated() {
        debug!(target: &address, "Authenticated as {}", params.user());
        Ok(())
    } else {
        Err(auth_error("credentials rejected".to_string()))
    }
}

async fn connect_internal(session: AsyncSession<TcpStream>) -> NetconfClientResult<SSHTransport> {
    if !session.authenticated() {
        return Err(NetconfClientError::Authentication {
            user: String::new(),
            reason: "ssh session is not authenticated".to_string(),
        });
    }
    let mut channel = session.channel_session().await?;
    channel.subsystem("netconf").await?;
    Ok(SSHTransport {
        session,
        framer: AsyncFramer::new(channel),
        closed: false,
    })
}
