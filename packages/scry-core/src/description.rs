//! UPnP device description fetching.
//!
//! A reply's LOCATION header points at an XML document describing the
//! device. This module fetches that document over HTTP and converts its
//! `<device>` subtree into a nested name → value map.
//!
//! Everything here degrades instead of failing: an unreachable device, a
//! non-success status, malformed XML or a document without a `<device>`
//! element all yield `None`, and the record keeps its header-derived fields.

use std::collections::BTreeMap;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use serde::Serialize;

/// Request timeout for description fetches. Embedded devices can be very
/// slow to serve their description document, so this is generous but finite.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One node of a converted `<device>` subtree.
///
/// Leaf elements map to their text content; elements with child elements
/// map to a nested table. When an element name repeats among siblings
/// (icon lists, service lists), the later value overwrites the earlier one
/// and only the last entry survives. Callers that need every repeated
/// sibling must parse the raw document themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DescriptionNode {
    /// Text content of a leaf element.
    Text(String),
    /// Child elements of a container element.
    Children(BTreeMap<String, DescriptionNode>),
}

impl DescriptionNode {
    /// Returns the child node under `name`, if this is a container.
    pub fn get(&self, name: &str) -> Option<&DescriptionNode> {
        match self {
            Self::Children(children) => children.get(name),
            Self::Text(_) => None,
        }
    }

    /// Returns the text content, if this is a leaf.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Children(_) => None,
        }
    }
}

/// Creates the shared HTTP client for description fetches.
///
/// One client per aggregation pass enables connection pooling across the
/// per-device requests.
pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}

/// Fetches and converts the description document at `location`.
pub async fn fetch(client: &Client, location: &str) -> Option<DescriptionNode> {
    if location.is_empty() {
        return None;
    }

    let response = match client.get(location).send().await {
        Ok(r) => r,
        Err(e) => {
            log::debug!("[Descr] GET {} failed: {}", location, e);
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        log::debug!("[Descr] GET {} returned {}", location, status);
        return None;
    }

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            log::debug!("[Descr] Reading body of {} failed: {}", location, e);
            return None;
        }
    };

    device_subtree(&body)
}

/// Finds the first `<device>` element in `xml` and converts its subtree.
///
/// Returns `None` for malformed XML or a document without a `<device>`
/// element.
pub fn device_subtree(xml: &str) -> Option<DescriptionNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"device" => {
                return parse_element(&mut reader);
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                log::debug!("[Descr] Malformed description XML: {}", e);
                return None;
            }
            _ => {}
        }
    }
}

/// Converts the element whose Start tag was just consumed, reading up to
/// and including its End tag.
fn parse_element(reader: &mut Reader<&[u8]>) -> Option<DescriptionNode> {
    let mut text = String::new();
    let mut children: BTreeMap<String, DescriptionNode> = BTreeMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let child = parse_element(reader)?;
                // Repeated sibling names overwrite - last one wins.
                children.insert(name, child);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                children.insert(name, DescriptionNode::Text(String::new()));
            }
            Ok(Event::Text(e)) => match e.decode() {
                Ok(t) => text.push_str(&t),
                Err(err) => {
                    log::debug!("[Descr] Undecodable text content: {}", err);
                    return None;
                }
            },
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                // Mixed content is not a thing in device descriptions; any
                // stray text inside a container element is dropped.
                return Some(if children.is_empty() {
                    DescriptionNode::Text(text.trim().to_string())
                } else {
                    DescriptionNode::Children(children)
                });
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                log::debug!("[Descr] Malformed description XML: {}", e);
                return None;
            }
            _ => {}
        }
    }
}
