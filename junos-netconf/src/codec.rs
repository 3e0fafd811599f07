//! Conversion between RPC payloads and NETCONF documents.
//!
//! Requests are wrapped in the `<rpc>` envelope here; message framing is
//! left to the [`crate::framer`] so the same document works with both the
//! end-of-message and the chunked encoding.

use crate::error::{NetconfClientError, NetconfClientResult};
use crate::message::{Hello, RpcReply};
use crate::operation::RpcOperation;
use crate::xml::Element;
use crate::NETCONF_URN;
use quick_xml::de::from_str;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

/// RPC command body as supplied by the caller, without the `<rpc>` envelope.
#[derive(Debug, Clone)]
pub enum RpcPayload {
    Text(String),
    Bytes(Vec<u8>),
    Element(Element),
}

impl RpcPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            RpcPayload::Text(_) => "string",
            RpcPayload::Bytes(_) => "bytes",
            RpcPayload::Element(_) => "element",
        }
    }

    pub fn into_element(self) -> NetconfClientResult<Element> {
        let element = match self {
            RpcPayload::Element(element) => element,
            RpcPayload::Text(text) => parse_payload(&text)?,
            RpcPayload::Bytes(bytes) => {
                let text = String::from_utf8(bytes).map_err(|err| {
                    NetconfClientError::InvalidPayload(format!(
                        "unsupported payload type: bytes that are not UTF-8 ({})",
                        err
                    ))
                })?;
                parse_payload(&text)?
            }
        };
        if element.local_name() == "rpc" {
            return Err(NetconfClientError::InvalidPayload(
                "payload must be the command element, not the <rpc> envelope".to_string(),
            ));
        }
        if element.name().is_empty() {
            return Err(NetconfClientError::InvalidPayload(
                "payload element has no name".to_string(),
            ));
        }
        Ok(element)
    }
}

fn parse_payload(text: &str) -> NetconfClientResult<Element> {
    text.parse::<Element>().map_err(|err| {
        NetconfClientError::InvalidPayload(format!("payload is not well-formed XML: {}", err))
    })
}

impl From<&str> for RpcPayload {
    fn from(value: &str) -> Self {
        RpcPayload::Text(value.to_string())
    }
}

impl From<String> for RpcPayload {
    fn from(value: String) -> Self {
        RpcPayload::Text(value)
    }
}

impl From<&[u8]> for RpcPayload {
    fn from(value: &[u8]) -> Self {
        RpcPayload::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for RpcPayload {
    fn from(value: Vec<u8>) -> Self {
        RpcPayload::Bytes(value)
    }
}

impl From<Element> for RpcPayload {
    fn from(value: Element) -> Self {
        RpcPayload::Element(value)
    }
}

impl From<&Element> for RpcPayload {
    fn from(value: &Element) -> Self {
        RpcPayload::Element(value.clone())
    }
}

impl From<RpcOperation> for RpcPayload {
    fn from(value: RpcOperation) -> Self {
        RpcPayload::Element(value.into_element())
    }
}

/// Wraps `payload` in an `<rpc>` envelope carrying `message_id`.
pub fn encode(payload: &Element, message_id: u64) -> NetconfClientResult<String> {
    let message_id = message_id.to_string();
    let mut start = BytesStart::new("rpc");
    start.push_attribute(("message-id", message_id.as_str()));
    start.push_attribute(("xmlns", NETCONF_URN));

    let mut writer = Writer::new(Vec::with_capacity(256));
    write_envelope(&mut writer, start, payload)
        .map_err(|err| NetconfClientError::InvalidPayload(err.to_string()))?;
    String::from_utf8(writer.into_inner())
        .map_err(|err| NetconfClientError::InvalidPayload(err.to_string()))
}

fn write_envelope(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart,
    payload: &Element,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(start))?;
    payload.write_to(writer)?;
    writer.write_event(Event::End(BytesEnd::new("rpc")))
}

/// Parses an `<rpc-reply>` document and extracts its message-id.
pub fn decode(response: &str) -> NetconfClientResult<RpcReply> {
    let root: Element = response
        .parse()
        .map_err(|err| NetconfClientError::MalformedResponse(format!("{}", err)))?;
    if root.local_name() != "rpc-reply" {
        return Err(NetconfClientError::MalformedResponse(format!(
            "expected <rpc-reply>, found <{}>",
            root.name()
        )));
    }
    let message_id = root
        .attribute("message-id")
        .ok_or_else(|| {
            NetconfClientError::MalformedResponse("<rpc-reply> has no message-id".to_string())
        })?
        .trim()
        .parse::<u64>()
        .map_err(|err| {
            NetconfClientError::MalformedResponse(format!("unreadable message-id: {}", err))
        })?;
    Ok(RpcReply::new(message_id, root))
}

pub fn decode_hello(response: &str) -> NetconfClientResult<Hello> {
    let root: Element = response
        .parse()
        .map_err(|err| NetconfClientError::Negotiation(format!("malformed hello: {}", err)))?;
    if root.local_name() != "hello" {
        return Err(NetconfClientError::Negotiation(format!(
            "expected <hello>, found <{}>",
            root.name()
        )));
    }
    from_str(response)
        .map_err(|err| NetconfClientError::Negotiation(format!("malformed hello: {}", err)))
}
