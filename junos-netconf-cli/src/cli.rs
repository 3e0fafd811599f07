use crate::commands::builtin::{builtin, builtin_exec, unknown_command};
use crate::config::CliConfig;
use clap::{
    arg, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, Command,
};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use junos_netconf::error::{NetconfClientError, NetconfClientResult};
use junos_netconf::Device;
use log::{debug, error, info};
use std::path::PathBuf;
use std::time::Instant;
use tokio::task::JoinHandle;

pub async fn exec(cmd: String, cfg: CliConfig) -> NetconfClientResult<()> {
    let hosts = &cfg.inner.addresses;
    let mut futures = FuturesUnordered::new();
    for addr in hosts {
        let params = cfg.inner.connect_params(addr)?;
        let address = params.address();
        let mut device = Device::new(params);
        device.set_timeout(cfg.inner.timeout);
        if let Some(logfile) = cfg.inner.logfile_for(addr) {
            device.log_to_file(&logfile)?;
            debug!(target: &address, "Recording messages to {}", logfile.display());
        }
        let start_time = Instant::now();
        let cmd_clone = cmd.clone();
        let cfg_clone = cfg.clone();
        let handle: JoinHandle<NetconfClientResult<()>> = tokio::spawn(async move {
            device.connect().await?;
            info!(target: &address, "Connected to host");
            debug!(
                target: &address,
                "Started Netconf session with session-id: {:?}",
                device.session_id()
            );

            let result = match builtin_exec(&cmd_clone, &mut device, &cfg_clone.inner).await {
                Some(result) => result,
                None => Err(unknown_command(&cmd_clone)),
            };
            match &result {
                Ok(reply) => println!("{}", reply),
                Err(err) => error!(target: &address, "{} failed: {}", cmd_clone, err),
            }

            info!(target: &address, "Operation took: {:.3}s", start_time.elapsed().as_secs_f32());
            device.close().await?;
            result.map(|_| ())
        });
        futures.push(handle);
    }

    let total = futures.len();
    let mut failed = 0;
    while let Some(handle) = futures.next().await {
        match handle {
            Ok(Ok(())) => debug!("Task completed successfully"),
            Ok(Err(err)) => {
                failed += 1;
                error!("Task failed with error: {}", err);
            }
            Err(err) => {
                failed += 1;
                error!("Task failed: {}", err);
            }
        }
    }
    summarize(failed, total)
}

fn summarize(failed: usize, total: usize) -> NetconfClientResult<()> {
    if failed == 0 {
        Ok(())
    } else {
        Err(NetconfClientError::new(format!(
            "{} of {} hosts failed",
            failed, total
        )))
    }
}

pub fn cli() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .long_version(crate_version!())
        .arg_required_else_help(true)
        .allow_external_subcommands(false)
        .bin_name("junos-netconf")
        .display_name("junos-netconf")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}

<green,bold>Commands:</>
    <cyan,bold>rpc</>               Execute raw rpc
    <cyan,bold>get</>               Execute get rpc
    <cyan,bold>get-config</>        Execute get-config rpc

See '<cyan,bold>junos-netconf help</> <cyan><<command>></>' for more information on a specific command.\n",
        ))
        .args([
            arg!(-v --verbose ... "Use verbose output (-vv to log all rpc exchanges, -vvv to trace framing)")
                .global(true),
            arg!(-q --quiet "Disable logging completely")
                .global(true),
            global_opt("host", "Devices to connect to, host or host:port")
                .env("NETCONF_HOST")
                .action(ArgAction::Append)
                .value_delimiter(','),
            global_opt("username", "Username for netconf connection")
                .env("NETCONF_USERNAME"),
            global_opt("password", "Password for netconf connection, ssh-agent is used without one")
                .env("NETCONF_PASSWORD")
                .hide_env(true),
            global_opt("timeout", "Seconds to wait for each rpc reply, 0 waits forever")
                .value_parser(value_parser!(u64))
                .default_value("60"),
            global_opt("logfile", "Append every exchanged message to this file")
                .value_parser(value_parser!(PathBuf)),
            global_opt("no-host-key-check", "Accept any host key")
                .action(ArgAction::SetTrue),
        ])
        .subcommands(builtin())
}

fn global_opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).help(help).long(name).global(true)
}

#[test]
fn verify_cli() {
    cli().debug_assert();
}

#[test]
fn failed_hosts_fail_the_run() {
    assert!(summarize(0, 3).is_ok());
    let err = summarize(2, 3).unwrap_err();
    assert_eq!(err.to_string(), "2 of 3 hosts failed");
}
