use crate::commands::builtin::{arg, value_of_if_exists};
use crate::config::Config;
use clap::{Command, ValueHint};
use junos_netconf::error::{NetconfClientError, NetconfClientResult};
use junos_netconf::{Device, Element};

pub fn cli() -> Command {
    Command::new("rpc")
        .about("Execute raw rpc")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}\n",
        ))
        .args([
            arg(
                "command",
                "RPC command element, e.g. '<get-software-information/>'",
                false,
                Some('c'),
                None,
                None,
                None,
            )
            .conflicts_with("file"),
            arg(
                "file",
                "File containing the RPC command element",
                false,
                Some('f'),
                None,
                Some(ValueHint::FilePath),
                None,
            ),
        ])
        .arg_required_else_help(true)
}

pub async fn exec(cfg: &Config, device: &mut Device) -> NetconfClientResult<Element> {
    let command = match (
        value_of_if_exists::<String>("command", &cfg.args),
        value_of_if_exists::<String>("file", &cfg.args),
    ) {
        (Some(command), _) => command.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path).await?,
        (None, None) => {
            return Err(NetconfClientError::InvalidPayload(
                "either --command or --file is required".to_string(),
            ))
        }
    };
    device.execute(command).await
}
