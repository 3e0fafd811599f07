use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} (at byte {position})")]
pub struct ParseError {
    message: String,
    position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Owned XML element tree.
///
/// Names are kept exactly as written on the wire, including any namespace
/// prefix; [`Element::local_name`] strips it for lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Element {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Element {
        self.set_attribute(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Element {
        self.push_child(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Element {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.children
    }

    /// Direct child elements, text nodes skipped.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn into_children(self) -> impl Iterator<Item = Element> {
        self.children.into_iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First direct child whose local name is `name`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children().find(|child| child.local_name() == name)
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children().filter(move |child| child.local_name() == name)
    }

    /// Concatenated text of the direct text nodes.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    pub fn find_text(&self, name: &str) -> Option<String> {
        self.find(name).map(|child| child.text())
    }

    pub(crate) fn write_to<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
    ) -> quick_xml::Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start));
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                Node::Element(child) => child.write_to(writer)?,
                Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = Writer::new(Vec::with_capacity(256));
        self.write_to(&mut writer).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&writer.into_inner()))
    }
}

impl FromStr for Element {
    type Err = ParseError;

    fn from_str(xml: &str) -> Result<Self, Self::Err> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|err| ParseError::new(err.to_string(), position))?;
            match event {
                Event::Start(start) => open.push(open_element(&start, position)?),
                Event::Empty(start) => {
                    let element = open_element(&start, position)?;
                    close_element(element, &mut open, &mut root, position)?;
                }
                Event::End(_) => {
                    let element = open
                        .pop()
                        .ok_or_else(|| ParseError::new("unexpected end tag", position))?;
                    close_element(element, &mut open, &mut root, position)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|err| ParseError::new(err.to_string(), position))?;
                    push_text(text.into_owned(), &mut open, position)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    push_text(text, &mut open, position)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(ParseError::new(
                format!("unclosed element <{}>", unclosed.name),
                xml.len(),
            ));
        }
        root.ok_or_else(|| ParseError::new("document has no root element", xml.len()))
    }
}

fn open_element(start: &BytesStart, position: usize) -> Result<Element, ParseError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| ParseError::new(err.to_string(), position))?;
        let value = attribute
            .unescape_value()
            .map_err(|err| ParseError::new(err.to_string(), position))?;
        element.attributes.push((
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

fn close_element(
    element: Element,
    open: &mut [Element],
    root: &mut Option<Element>,
    position: usize,
) -> Result<(), ParseError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(ParseError::new(
                format!("unexpected second root element <{}>", element.name),
                position,
            ))
        }
    }
    Ok(())
}

fn push_text(text: String, open: &mut [Element], position: usize) -> Result<(), ParseError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text));
            Ok(())
        }
        None => Err(ParseError::new("text outside of the root element", position)),
    }
}
