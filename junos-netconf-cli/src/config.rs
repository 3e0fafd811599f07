use crate::commands::builtin::{value_of, value_of_if_exists, values_of};
use clap::ArgMatches;
use dirs::home_dir;
use junos_netconf::error::{NetconfClientError, NetconfClientResult};
use junos_netconf::{ConnectParams, HostKeyVerification};
use log::{debug, error, warn};
use ssh2_config::{HostParams, ParseRule, SshConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub inner: Arc<Config>,
}

#[derive(Debug)]
pub struct Config {
    pub args: ArgMatches,
    pub ssh_config: Option<SshConfig>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub addresses: Vec<String>,
    pub timeout: Option<Duration>,
    pub logfile: Option<PathBuf>,
    pub verification: HostKeyVerification,
}

impl CliConfig {
    pub fn new(args: ArgMatches) -> NetconfClientResult<Self> {
        let mut ssh_dir = home_dir().unwrap_or(PathBuf::from("/"));
        ssh_dir.extend(Path::new(".ssh/config"));
        let ssh_config = read_ssh_config(&ssh_dir);
        let hosts: Vec<String> = values_of::<String>("host", &args)
            .iter()
            .map(|h| h.to_string())
            .collect();
        if hosts.is_empty() {
            return Err(NetconfClientError::MissingCredentials("host"));
        }
        let username = value_of_if_exists::<String>("username", &args).cloned();
        let password = value_of_if_exists::<String>("password", &args).cloned();
        let timeout = match *value_of::<u64>("timeout", &args) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let logfile = value_of_if_exists::<PathBuf>("logfile", &args).cloned();
        let verification = if *value_of::<bool>("no-host-key-check", &args) {
            HostKeyVerification::AcceptAny
        } else {
            HostKeyVerification::Strict
        };
        Ok(Self {
            inner: Arc::new(Config {
                username,
                password,
                addresses: hosts,
                timeout,
                logfile,
                verification,
                args,
                ssh_config,
            }),
        })
    }
}

impl Config {
    /// Connection parameters for `addr`, filled in from `~/.ssh/config`
    /// where the command line leaves them open.
    pub fn connect_params(&self, addr: &str) -> NetconfClientResult<ConnectParams> {
        let host_params = match &self.ssh_config {
            Some(ssh_config) => ssh_config.query(host_alias(addr)),
            None => HostParams::default(),
        };
        resolve(
            addr,
            self.username.as_deref(),
            self.password.as_deref(),
            &host_params,
        )
        .map(|params| params.host_key_verification(self.verification))
    }

    /// Per-host log file: `<logfile>.<host>` when more than one host runs.
    pub fn logfile_for(&self, addr: &str) -> Option<PathBuf> {
        let logfile = self.logfile.as_ref()?;
        if self.addresses.len() < 2 {
            return Some(logfile.clone());
        }
        let mut name = logfile.as_os_str().to_os_string();
        name.push(format!(".{}", host_alias(addr)));
        Some(PathBuf::from(name))
    }
}

fn host_alias(addr: &str) -> &str {
    match addr.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.parse::<u16>().is_ok() => name,
        _ => addr,
    }
}

fn resolve(
    addr: &str,
    username: Option<&str>,
    password: Option<&str>,
    host_params: &HostParams,
) -> NetconfClientResult<ConnectParams> {
    let user = match username.or(host_params.user.as_deref()) {
        Some(user) => user,
        None => return Err(NetconfClientError::MissingCredentials("user")),
    };

    let alias = host_alias(addr);
    let explicit_port = alias != addr;
    let hostname = host_params.host_name.as_deref().unwrap_or(alias);
    let mut params = ConnectParams::new(hostname, user);
    if explicit_port {
        params = params.port(ConnectParams::new(addr, user).port_number());
    } else if let Some(port) = host_params.port {
        params = params.port(port);
    }
    if let Some(password) = password {
        params = params.password(password);
    } else {
        debug!(target: &params.address(), "No password given, using ssh-agent keys");
    }
    Ok(params)
}

fn read_ssh_config(dir: &Path) -> Option<SshConfig> {
    debug!("Trying to parse ssh configuration '{}'", dir.display());

    let mut reader = match File::open(dir) {
        Ok(f) => BufReader::new(f),
        Err(err) => {
            warn!(
                "Could not open ssh config file '{}', error: {}",
                dir.display(),
                err
            );
            return None;
        }
    };
    match SshConfig::default().parse(&mut reader, ParseRule::ALLOW_UNKNOWN_FIELDS) {
        Ok(config) => {
            debug!("Successfully parsed configuration");
            Some(config)
        }
        Err(err) => {
            error!("Failed to parse ssh configuration, error '{}'", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_command_line() {
        let params = resolve("r1:2022", Some("admin"), Some("x"), &HostParams::default()).unwrap();
        assert_eq!(params.host(), "r1");
        assert_eq!(params.port_number(), 2022);
        assert_eq!(params.user(), "admin");
    }

    #[test]
    fn test_resolve_from_ssh_config() {
        let mut reader = BufReader::new(
            "Host r1\n    HostName 192.0.2.1\n    User netops\n    Port 2830\n".as_bytes(),
        );
        let config = SshConfig::default()
            .parse(&mut reader, ParseRule::STRICT)
            .unwrap();
        let params = resolve("r1", None, None, &config.query("r1")).unwrap();
        assert_eq!(params.host(), "192.0.2.1");
        assert_eq!(params.port_number(), 2830);
        assert_eq!(params.user(), "netops");

        let params = resolve("r1:830", Some("admin"), None, &config.query("r1")).unwrap();
        assert_eq!(params.port_number(), 830);
        assert_eq!(params.user(), "admin");
    }

    #[test]
    fn test_resolve_requires_user() {
        assert!(matches!(
            resolve("r1", None, None, &HostParams::default()),
            Err(NetconfClientError::MissingCredentials("user"))
        ));
    }
}
