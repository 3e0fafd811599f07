use crate::commands::builtin::{arg, filter_of, with_defaults_of};
use crate::config::Config;
use clap::{Command, ValueHint};
use junos_netconf::error::NetconfClientResult;
use junos_netconf::{Device, Element};

pub fn cli() -> Command {
    Command::new("get")
        .about("Execute get rpc")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}\n",
        ))
        .args([
            arg(
                "filter",
                "File containing a subtree filter",
                false,
                Some('f'),
                None,
                Some(ValueHint::FilePath),
                None,
            ),
            arg(
                "with-defaults",
                "With-defaults option",
                false,
                None,
                None,
                None,
                ["report-all", "report-all-tagged", "trim", "explicit"],
            )
            .env("NETCONF_WITH_DEFAULTS"),
        ])
}

pub async fn exec(cfg: &Config, device: &mut Device) -> NetconfClientResult<Element> {
    let filter = filter_of("filter", &cfg.args).await?;
    let with_defaults = with_defaults_of("with-defaults", &cfg.args)?;
    device.get(filter, with_defaults).await
}
