//! Shared types for SSDP discovery.

use serde::Serialize;
use thiserror::Error;

use crate::description::DescriptionNode;

/// Errors that can occur during an SSDP discovery run.
///
/// Only transport-level failures live here. A receive window that closes
/// without replies is a normal outcome, not an error, and content-level
/// anomalies (missing headers, unreachable description documents) degrade
/// to empty fields on the record instead.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to create or bind the UDP socket.
    #[error("failed to set up UDP socket: {0}")]
    SocketSetup(#[source] std::io::Error),

    /// Failed to send the M-SEARCH multicast datagram.
    #[error("failed to send M-SEARCH: {0}")]
    SendSearch(#[source] std::io::Error),

    /// A receive call failed with something other than the window timeout.
    #[error("failed to receive SSDP reply: {0}")]
    Receive(#[source] std::io::Error),
}

/// Convenient Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// One parsed SSDP reply.
///
/// Header-derived fields are plain strings, empty when the reply omits
/// them - many real devices skip optional headers, and consumers stay
/// simpler without per-field options. A record with every field empty is
/// still valid output.
///
/// UUID uniqueness is never assumed here: duplicate announcements, UUID
/// collisions and multiple search targets per device are all expected.
/// Deduplication is explicit and query-mode-specific.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Base64 encoding of the full datagram, kept for diagnostics/replay.
    pub raw_response: String,
    /// SERVER header value.
    pub server: String,
    /// LOCATION header value (URI of the device description document).
    pub location: String,
    /// ST header value (search target echoed by the device).
    pub search_target: String,
    /// USN header value (usually a combination of uuid and search target).
    pub usn: String,
    /// Dotted-quad IPv4 extracted from the LOCATION value; empty if unparsable.
    pub ip: String,
    /// Device UUID extracted from a `uuid:` token in the reply; empty if absent.
    pub uuid: String,
    /// Parsed `<device>` subtree of the description document.
    /// Attached only by the query modes that fetch it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<DescriptionNode>,
}
