use crate::error::{NetconfClientError, NetconfClientResult};
use crate::NETCONF_PORT;
use core::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Host key must be present in `known_hosts` and match.
    #[default]
    Strict,
    /// Any host key is accepted. The caller trusts the network path.
    AcceptAny,
}

/// Everything needed to reach and authenticate against a device.
///
/// The password can be set but is never handed back out; without one the
/// transport authenticates with the keys loaded in the ssh-agent.
#[derive(Clone)]
pub struct ConnectParams {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    host_key_verification: HostKeyVerification,
    known_hosts: Option<PathBuf>,
}

impl ConnectParams {
    /// `host` may carry a port (`r1:22`); without one the NETCONF port 830
    /// is used.
    pub fn new(host: &str, user: &str) -> ConnectParams {
        let (host, port) = match host.rsplit_once(':') {
            Some((name, port)) if !name.contains(':') => match port.parse::<u16>() {
                Ok(port) => (name.to_string(), port),
                Err(_) => (host.to_string(), NETCONF_PORT),
            },
            _ => (host.to_string(), NETCONF_PORT),
        };
        ConnectParams {
            host,
            port,
            user: user.to_string(),
            password: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts: None,
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> ConnectParams {
        self.set_password(password);
        self
    }

    pub fn port(mut self, port: u16) -> ConnectParams {
        self.port = port;
        self
    }

    pub fn host_key_verification(mut self, verification: HostKeyVerification) -> ConnectParams {
        self.host_key_verification = verification;
        self
    }

    pub fn known_hosts(mut self, path: impl AsRef<Path>) -> ConnectParams {
        self.known_hosts = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn port_number(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn verification(&self) -> HostKeyVerification {
        self.host_key_verification
    }

    /// Explicit `known_hosts` file, or `~/.ssh/known_hosts`.
    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        self.known_hosts.clone().or_else(|| {
            dirs::home_dir().map(|mut home| {
                home.extend(Path::new(".ssh/known_hosts"));
                home
            })
        })
    }

    #[cfg_attr(not(feature = "async-ssh2-lite"), allow(dead_code))]
    pub(crate) fn secret(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub(crate) fn validate(&self) -> NetconfClientResult<()> {
        if self.host.trim().is_empty() {
            return Err(NetconfClientError::MissingCredentials("host"));
        }
        if self.user.trim().is_empty() {
            return Err(NetconfClientError::MissingCredentials("user"));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host_key_verification", &self.host_key_verification)
            .field("known_hosts", &self.known_hosts)
            .finish()
    }
}
