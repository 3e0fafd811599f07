use crate::error::{NetconfClientError, NetconfClientResult};
use crate::xml::Element;
use crate::{NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP, NETCONF_URN};
use core::fmt;
use core::fmt::Display;
use log::warn;
use quick_xml::se::Serializer;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename(serialize = "hello"))]
pub struct Hello {
    #[serde(rename = "@xmlns", default)]
    xmlns: String,
    capabilities: Capabilities,
    #[serde(rename = "session-id", skip_serializing_if = "Option::is_none")]
    session_id: Option<u64>,
}

impl Hello {
    pub fn new() -> Hello {
        Hello {
            xmlns: NETCONF_URN.to_string(),
            session_id: None,
            capabilities: Capabilities {
                capability: vec![
                    NETCONF_BASE_10_CAP.to_string(),
                    NETCONF_BASE_11_CAP.to_string(),
                ],
            },
        }
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities
            .capability
            .iter()
            .map(|capability| capability.trim())
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities().any(|cap| cap == capability)
    }

    pub fn session_id(&self) -> Option<u64> {
        self.session_id
    }
}

impl Display for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(206);
        let ser = Serializer::new(&mut buffer);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        write!(f, "{}", buffer)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Capabilities {
    #[serde(default)]
    capability: Vec<String>,
}

/// A decoded `<rpc-reply>` and the message-id it answers.
#[derive(Debug, Clone)]
pub struct RpcReply {
    message_id: u64,
    root: Element,
}

impl RpcReply {
    pub(crate) fn new(message_id: u64, root: Element) -> RpcReply {
        RpcReply { message_id, root }
    }

    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn is_ok(&self) -> bool {
        self.root.find("ok").is_some() && !self.has_errors()
    }

    /// Every reported `<rpc-error>`, warnings included.
    pub fn errors(&self) -> Vec<RpcError> {
        self.root
            .find_all("rpc-error")
            .map(RpcError::from_element)
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().iter().any(RpcError::is_error)
    }

    /// Fails when the device reported an `<rpc-error>` with severity
    /// `error`. Warnings are logged and the reply is kept.
    pub fn check(self) -> NetconfClientResult<RpcReply> {
        let (errors, warnings): (Vec<RpcError>, Vec<RpcError>) =
            self.errors().into_iter().partition(RpcError::is_error);
        for warning in &warnings {
            warn!("Device warning for message-id {}: {}", self.message_id, warning);
        }
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(NetconfClientError::Device(RpcErrors(errors)))
        }
    }

    /// The reply payload: the first child element that is not an
    /// `<rpc-error>`, or the `<rpc-reply>` element itself when there is none.
    pub fn into_payload(self) -> Element {
        let is_payload = |child: &Element| child.local_name() != "rpc-error";
        if !self.root.children().any(is_payload) {
            return self.root;
        }
        self.root
            .into_children()
            .find(|child| is_payload(child))
            .unwrap_or_default()
    }
}

impl Display for RpcReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Error,
    Warning,
}

/// Structured detail of one `<rpc-error>` element (RFC 6241 section 4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub error_type: Option<String>,
    pub error_tag: Option<String>,
    pub error_severity: ErrorSeverity,
    pub error_app_tag: Option<String>,
    pub error_path: Option<String>,
    pub error_message: Option<String>,
    pub error_info: Option<Element>,
}

impl RpcError {
    pub fn from_element(element: &Element) -> RpcError {
        let error_severity = match element.find_text("error-severity").as_deref() {
            Some("warning") => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        };
        RpcError {
            error_type: element.find_text("error-type"),
            error_tag: element.find_text("error-tag"),
            error_severity,
            error_app_tag: element.find_text("error-app-tag"),
            error_path: element.find_text("error-path"),
            error_message: element.find_text("error-message"),
            error_info: element.find("error-info").cloned(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_severity == ErrorSeverity::Error
    }
}

impl Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.error_severity {
            ErrorSeverity::Error => "error",
            ErrorSeverity::Warning => "warning",
        };
        write!(f, "{}", severity)?;
        if let Some(error_type) = &self.error_type {
            write!(f, " [{}", error_type)?;
            if let Some(tag) = &self.error_tag {
                write!(f, "/{}", tag)?;
            }
            write!(f, "]")?;
        }
        if let Some(message) = &self.error_message {
            write!(f, ": {}", message)?;
        }
        if let Some(path) = &self.error_path {
            write!(f, " (path {})", path)?;
        }
        if let Some(info) = &self.error_info {
            write!(f, " {}", info)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcErrors(pub Vec<RpcError>);

impl RpcErrors {
    pub fn iter(&self) -> impl Iterator<Item = &RpcError> {
        self.0.iter()
    }
}

impl Display for RpcErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quick_xml::de::from_str;

    fn reply(xml: &str) -> RpcReply {
        let root: Element = xml.parse().unwrap();
        RpcReply::new(1, root)
    }

    #[test]
    fn test_reply_with_errors() {
        let reply = reply(
            r#"
<rpc-reply message-id="1" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <rpc-error>
    <error-type>protocol</error-type>
    <error-tag>bad-element</error-tag>
    <error-severity>error</error-severity>
    <error-message>Element is not valid in the specified context.</error-message>
    <error-info>
      <bad-element>startu</bad-element>
    </error-info>
  </rpc-error>
  <rpc-error>
    <error-type>app</error-type>
    <error-tag>bad-element</error-tag>
    <error-severity>error</error-severity>
    <error-message>Element is not valid in the specified context.</error-message>
  </rpc-error>
</rpc-reply>
"#,
        );
        assert!(reply.has_errors());
        let errors = reply.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error_tag.as_deref(), Some("bad-element"));
        assert_eq!(
            errors[0].error_info.as_ref().and_then(|info| info.find_text("bad-element")),
            Some("startu".to_string())
        );

        match reply.check() {
            Err(NetconfClientError::Device(errors)) => {
                assert_eq!(errors.iter().count(), 2);
                assert!(errors
                    .to_string()
                    .starts_with("error [protocol/bad-element]: Element is not valid"));
            }
            other => panic!("expected device error, got {:?}", other),
        }
    }

    #[test]
    fn test_reply_with_warning_only() {
        let reply = reply(
            r#"
<rpc-reply message-id="1">
  <rpc-error>
    <error-type>protocol</error-type>
    <error-severity>warning</error-severity>
    <error-message>statement has no contents; ignored</error-message>
  </rpc-error>
  <configuration-information>
    <configuration-output>system { host-name r1; }</configuration-output>
  </configuration-information>
</rpc-reply>
"#,
        );
        assert!(!reply.has_errors());
        let payload = reply.check().unwrap().into_payload();
        assert_eq!(payload.name(), "configuration-information");
    }

    #[test]
    fn test_ok_reply() {
        let reply = reply(r#"<rpc-reply message-id="1"><ok/></rpc-reply>"#);
        assert!(reply.is_ok());
        assert_eq!(reply.into_payload().name(), "ok");

        let empty = RpcReply::new(1, "<rpc-reply message-id=\"1\"/>".parse().unwrap());
        assert_eq!(empty.into_payload().name(), "rpc-reply");
    }

    #[test]
    fn test_serialize_hello() {
        let expected = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability><capability>urn:ietf:params:netconf:base:1.1</capability></capabilities></hello>"#;
        assert_eq!(Hello::new().to_string(), expected);
    }

    #[test]
    fn test_deserialize_junos_hello() {
        let hello = r#"
<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
    <capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>
    <capability>http://xml.juniper.net/netconf/junos/1.0</capability>
  </capabilities>
  <session-id>27700</session-id>
</hello>
"#;
        let hello: Hello = from_str(hello).unwrap();
        assert_eq!(hello.session_id(), Some(27700));
        assert!(hello.has_capability(NETCONF_BASE_10_CAP));
        assert!(!hello.has_capability(NETCONF_BASE_11_CAP));
        assert_eq!(hello.capabilities().count(), 3);
    }
}
