use crate::commands::*;
use crate::config::Config;
use clap::builder::{IntoResettable, ValueParser};
use clap::{Arg, ArgMatches, Command, ValueHint};
use junos_netconf::error::{NetconfClientError, NetconfClientResult};
use junos_netconf::operation::{Filter, WithDefaultsValue};
use junos_netconf::{Device, Element};
use std::str::FromStr;

pub fn builtin() -> Vec<Command> {
    vec![rpc::cli(), get::cli(), get_config::cli()]
}

pub async fn builtin_exec(
    cmd: &str,
    device: &mut Device,
    args: &Config,
) -> Option<NetconfClientResult<Element>> {
    let f = match cmd {
        "rpc" => rpc::exec(args, device).await,
        "get" => get::exec(args, device).await,
        "get-config" => get_config::exec(args, device).await,
        _ => return None,
    };
    Some(f)
}

pub(crate) fn value_of<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> &'a T {
    args.get_one::<T>(name)
        .unwrap_or_else(|| panic!("argument '{}' has a default value", name))
}

pub(crate) fn value_of_if_exists<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> Option<&'a T> {
    if args.contains_id(name) {
        args.get_one::<T>(name)
    } else {
        None
    }
}

pub(crate) fn values_of<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> Vec<&'a T> {
    args.get_many::<T>(name).unwrap_or_default().collect()
}

/// Subtree filter read from the file named by `name`, if given.
pub(crate) async fn filter_of(name: &str, args: &ArgMatches) -> NetconfClientResult<Option<Filter>> {
    match value_of_if_exists::<String>(name, args) {
        Some(path) => {
            let content = tokio::fs::read_to_string(path).await?;
            Filter::subtree(&content).map(Some)
        }
        None => Ok(None),
    }
}

pub(crate) fn with_defaults_of(
    name: &str,
    args: &ArgMatches,
) -> NetconfClientResult<Option<WithDefaultsValue>> {
    value_of_if_exists::<String>(name, args)
        .map(|value| WithDefaultsValue::from_str(value))
        .transpose()
}

pub(crate) fn unknown_command(cmd: &str) -> NetconfClientError {
    NetconfClientError::Anyhow(anyhow::Error::msg(format!("Unknown command '{}'", cmd)))
}

pub(super) fn arg(
    name: &'static str,
    help: &'static str,
    required: bool,
    short: Option<char>,
    default: Option<&'static str>,
    hint: Option<ValueHint>,
    parser: impl IntoResettable<ValueParser>,
) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .required(required)
        .default_value(default)
        .value_hint(hint)
        .value_parser(parser)
}
