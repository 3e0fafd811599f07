use crate::commands::builtin::{arg, filter_of, value_of, with_defaults_of};
use crate::config::Config;
use clap::{Command, ValueHint};
use junos_netconf::error::NetconfClientResult;
use junos_netconf::operation::Datastore;
use junos_netconf::{Device, Element};
use std::str::FromStr;

pub fn cli() -> Command {
    Command::new("get-config")
        .about("Execute get-config rpc")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}\n",
        ))
        .args([
            arg(
                "source",
                "Datastore to get config",
                false,
                Some('s'),
                Some("running"),
                None,
                ["running", "startup", "candidate"],
            ),
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
    let source = Datastore::from_str(value_of::<String>("source", &cfg.args))?;
    let filter = filter_of("filter", &cfg.args).await?;
    let with_defaults = with_defaults_of("with-defaults", &cfg.args)?;
    device.get_config(source, filter, with_defaults).await
}
