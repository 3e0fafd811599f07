use crate::commands::builtin::value_of;
use config::CliConfig;
use env_logger::{Builder, Target};
use junos_netconf::error::NetconfClientResult;
use log::{warn, LevelFilter};

mod cli;
mod commands;
mod config;

fn init_logging(verbosity: &u8) {
    let mut builder = Builder::new();
    match verbosity {
        1 => {
            builder.filter_level(LevelFilter::Debug);
            builder.filter_module("junos_netconf", LevelFilter::Off)
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
            builder.filter_module("junos_netconf::framer", LevelFilter::Off);
            builder.filter_module("junos_netconf::session", LevelFilter::Debug)
        }
        3 => {
            builder.filter_level(LevelFilter::Trace);
            builder.filter_module("junos_netconf", LevelFilter::Trace)
        }
        _ => {
            builder.filter_level(LevelFilter::Info);
            builder.filter_module("junos_netconf", LevelFilter::Warn)
        }
    };
    builder.target(Target::Stdout);
    builder.init();
}

#[tokio::main]
async fn main() -> NetconfClientResult<()> {
    let mut args = cli::cli().get_matches();
    let verbosity = value_of::<u8>("verbose", &args);
    let disable_logging = value_of::<bool>("quiet", &args);
    if !disable_logging {
        init_logging(verbosity);
    }

    match args.remove_subcommand() {
        Some((cmd, sub_args)) => {
            let cli_config = CliConfig::new(sub_args)?;
            tokio::select! {
                result = cli::exec(cmd, cli_config) => result?,
                _ = tokio::signal::ctrl_c() => warn!("Interrupted, sessions were not closed"),
            }
        }
        _ => {
            cli::cli().print_help()?;
        }
    }
    Ok(())
}
