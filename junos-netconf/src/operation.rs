use crate::error::{NetconfClientError, NetconfClientResult};
use crate::xml::Element;
use core::str::FromStr;

const WITH_DEFAULTS_URN: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-with-defaults";

/// Base protocol operations from RFC 6241, rendered as RPC payloads.
#[derive(Debug, Clone)]
pub enum RpcOperation {
    CloseSession,
    KillSession {
        session_id: u64,
    },
    Validate {
        source: Datastore,
    },
    GetConfig {
        source: Datastore,
        filter: Option<Filter>,
        with_defaults: Option<WithDefaultsValue>,
    },
    Get {
        filter: Option<Filter>,
        with_defaults: Option<WithDefaultsValue>,
    },
    Commit(Commit),
}

impl RpcOperation {
    pub fn new_get_config(
        source: Datastore,
        filter: Option<Filter>,
        with_defaults: Option<WithDefaultsValue>,
    ) -> RpcOperation {
        RpcOperation::GetConfig {
            source,
            filter,
            with_defaults,
        }
    }

    pub fn new_get(filter: Option<Filter>, with_defaults: Option<WithDefaultsValue>) -> RpcOperation {
        RpcOperation::Get {
            filter,
            with_defaults,
        }
    }

    pub fn new_commit(
        confirmed: bool,
        confirm_timeout: Option<u32>,
        persist: Option<String>,
        persist_id: Option<String>,
    ) -> RpcOperation {
        RpcOperation::Commit(Commit {
            confirmed,
            confirm_timeout,
            persist,
            persist_id,
        })
    }

    pub fn into_element(self) -> Element {
        match self {
            RpcOperation::CloseSession => Element::new("close-session"),
            RpcOperation::KillSession { session_id } => Element::new("kill-session")
                .with_child(Element::new("session-id").with_text(session_id.to_string())),
            RpcOperation::Validate { source } => {
                Element::new("validate").with_child(source.into_source())
            }
            RpcOperation::GetConfig {
                source,
                filter,
                with_defaults,
            } => {
                let mut element = Element::new("get-config").with_child(source.into_source());
                append_retrieval_options(&mut element, filter, with_defaults);
                element
            }
            RpcOperation::Get {
                filter,
                with_defaults,
            } => {
                let mut element = Element::new("get");
                append_retrieval_options(&mut element, filter, with_defaults);
                element
            }
            RpcOperation::Commit(commit) => commit.into_element(),
        }
    }
}

fn append_retrieval_options(
    element: &mut Element,
    filter: Option<Filter>,
    with_defaults: Option<WithDefaultsValue>,
) {
    if let Some(filter) = filter {
        element.push_child(filter.into_element());
    }
    if let Some(value) = with_defaults {
        element.push_child(
            Element::new("with-defaults")
                .with_attribute("xmlns", WITH_DEFAULTS_URN)
                .with_text(value.as_str()),
        );
    }
}

#[derive(Debug, Clone, Default)]
pub struct Commit {
    confirmed: bool,
    confirm_timeout: Option<u32>,
    persist: Option<String>,
    persist_id: Option<String>,
}

impl Commit {
    fn into_element(self) -> Element {
        let mut element = Element::new("commit");
        if self.confirmed {
            element.push_child(Element::new("confirmed"));
        }
        if let Some(timeout) = self.confirm_timeout {
            element.push_child(Element::new("confirm-timeout").with_text(timeout.to_string()));
        }
        if let Some(persist) = self.persist {
            element.push_child(Element::new("persist").with_text(persist));
        }
        if let Some(persist_id) = self.persist_id {
            element.push_child(Element::new("persist-id").with_text(persist_id));
        }
        element
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithDefaultsValue {
    ReportAll,
    ReportAllTagged,
    Trim,
    Explicit,
}

impl WithDefaultsValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithDefaultsValue::ReportAll => "report-all",
            WithDefaultsValue::ReportAllTagged => "report-all-tagged",
            WithDefaultsValue::Trim => "trim",
            WithDefaultsValue::Explicit => "explicit",
        }
    }
}

impl FromStr for WithDefaultsValue {
    type Err = NetconfClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let defaults = s.to_lowercase();
        match defaults.as_str() {
            "report-all" => Ok(WithDefaultsValue::ReportAll),
            "report-all-tagged" => Ok(WithDefaultsValue::ReportAllTagged),
            "trim" => Ok(WithDefaultsValue::Trim),
            "explicit" => Ok(WithDefaultsValue::Explicit),
            _ => Err(NetconfClientError::new(format!(
                "unknown with-defaults value: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datastore {
    Candidate,
    Running,
    Startup,
    Url(String),
}

impl Datastore {
    fn into_source(self) -> Element {
        let datastore = match self {
            Datastore::Candidate => Element::new("candidate"),
            Datastore::Running => Element::new("running"),
            Datastore::Startup => Element::new("startup"),
            Datastore::Url(url) => Element::new("url").with_text(url),
        };
        Element::new("source").with_child(datastore)
    }
}

impl FromStr for Datastore {
    type Err = NetconfClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let datastore = s.to_lowercase();
        match datastore.as_str() {
            "running" => Ok(Datastore::Running),
            "candidate" => Ok(Datastore::Candidate),
            "startup" => Ok(Datastore::Startup),
            _ => {
                if datastore.starts_with("http")
                    || datastore.starts_with("file")
                    || datastore.starts_with("ftp")
                {
                    Ok(Datastore::Url(s.to_string()))
                } else {
                    Err(NetconfClientError::UnknownDatastore {
                        expected: vec![
                            "running".to_string(),
                            "candidate".to_string(),
                            "startup".to_string(),
                            "ftp|http|file".to_string(),
                        ],
                        unknown: datastore,
                    })
                }
            }
        }
    }
}

/// Subtree filter for `<get>` and `<get-config>`.
#[derive(Debug, Clone)]
pub struct Filter {
    content: Element,
}

impl Filter {
    pub fn subtree(filter: &str) -> NetconfClientResult<Filter> {
        let content = Filter::strip_slashes(filter)
            .ok_or_else(|| {
                NetconfClientError::InvalidPayload("filter ends with a dangling escape".to_string())
            })?
            .parse::<Element>()
            .map_err(|err| NetconfClientError::InvalidPayload(format!("invalid filter: {}", err)))?;
        Ok(Filter { content })
    }

    pub fn from_element(content: Element) -> Filter {
        Filter { content }
    }

    fn into_element(self) -> Element {
        Element::new("filter")
            .with_attribute("type", "subtree")
            .with_child(self.content)
    }

    fn strip_slashes(s: &str) -> Option<String> {
        let mut n = String::new();
        let mut chars = s.trim().chars();

        while let Some(c) = chars.next() {
            n.push(match c {
                '\\' => chars.next()?,
                c => c,
            });
        }

        Some(n)
    }
}
