//! SSDP M-SEARCH discovery engine.
//!
//! Sends a single multicast M-SEARCH to 239.255.255.250:1900 and collects
//! the unicast replies that devices send back to the ephemeral source port.
//! The collection window is pure timing: a receive that waits the full
//! window without a datagram means no more replies are expected, and the
//! run ends. Devices that answer just after the window closes are lost -
//! the protocol gives no way to know the responder count in advance.
//!
//! Replies are HTTP-response-like text over UDP. Parsing here is deliberate
//! pattern matching over loosely structured lines, not a strict HTTP
//! parser: devices vary in header casing, whitespace and line endings, and
//! a reply that yields only empty fields is still a valid record.

use std::net::SocketAddr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use super::types::{DeviceRecord, DiscoveryError, DiscoveryResult};

/// Standard SSDP multicast address and port (protocol specification).
const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Maximum reply payload read per datagram. SSDP replies are small
/// headers-only text; anything beyond this is truncated.
const MAX_REPLY_SIZE: usize = 1024;

/// Builds the M-SEARCH message.
///
/// `MX` tells devices how long to randomize their reply delay up to, so it
/// should not exceed the caller's receive window. That is a documented
/// precondition, not a runtime check - SSDP is fire-and-forget.
fn build_msearch(st: &str, mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         ST: {}\r\n\
         MX: {}\r\n\r\n",
        st, mx
    )
}

/// Creates the UDP socket for one discovery run.
///
/// Bound to an ephemeral port on all interfaces - replies come back unicast
/// to the sending port, and binding 1900 would collide with any local SSDP
/// server. Socket options follow UPnP 1.0: multicast TTL of 4, SO_REUSEADDR
/// for rapid restarts. Option failures are non-fatal; bind failures are.
fn create_socket() -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[SSDP] Failed to set SO_REUSEADDR: {}", e);
    }

    // UPnP 1.0 spec recommends TTL of 4 for SSDP multicast
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[SSDP] Failed to set multicast TTL: {}", e);
    }

    // Set non-blocking before converting to tokio socket
    socket.set_nonblocking(true)?;

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], 0));
    socket.bind(&bind_addr.into())?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Performs one multicast M-SEARCH and collects replies until the window
/// closes.
///
/// `window` is the receive timeout applied to each read: the run ends when
/// no datagram arrives for a full `window`, so a steady trickle of replies
/// keeps the collection open. `mx` defaults to the window length in whole
/// seconds when not supplied.
///
/// An empty vec is a normal outcome - absence of devices is not a failure.
/// Socket setup, send, and non-timeout receive errors abort the run.
pub async fn search(
    st: &str,
    window: Duration,
    mx: Option<u64>,
) -> DiscoveryResult<Vec<DeviceRecord>> {
    let mx = mx.unwrap_or_else(|| window.as_secs().max(1));
    let msg = build_msearch(st, mx);

    let socket = create_socket().map_err(DiscoveryError::SocketSetup)?;
    socket
        .send_to(msg.as_bytes(), MULTICAST_ADDR)
        .await
        .map_err(DiscoveryError::SendSearch)?;
    log::debug!(
        "[SSDP] M-SEARCH sent (ST={}, MX={}, window={}ms)",
        st,
        mx,
        window.as_millis()
    );

    let mut replies = Vec::new();
    let mut buf = [0u8; MAX_REPLY_SIZE];
    loop {
        match tokio::time::timeout(window, socket.recv_from(&mut buf)).await {
            Ok(Ok((amt, src))) => {
                log::trace!("[SSDP] {} byte reply from {}", amt, src);
                replies.push(parse_reply(&buf[..amt]));
            }
            Ok(Err(e)) => return Err(DiscoveryError::Receive(e)),
            // Window closed without a datagram - no more replies expected.
            Err(_) => break,
        }
    }

    log::debug!("[SSDP] Window closed: {} replies (ST={})", replies.len(), st);
    Ok(replies)
}

// ─────────────────────────────────────────────────────────────────────────────
// Reply Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parses one raw datagram into a `DeviceRecord`.
///
/// Never fails: every missing or malformed field degrades to an empty
/// string, and the full datagram is preserved base64-encoded.
pub(crate) fn parse_reply(datagram: &[u8]) -> DeviceRecord {
    let text = String::from_utf8_lossy(datagram);
    let location = header_value(&text, "LOCATION");
    DeviceRecord {
        raw_response: STANDARD.encode(datagram),
        server: header_value(&text, "SERVER"),
        ip: extract_ipv4(&location),
        location,
        search_target: header_value(&text, "ST"),
        usn: header_value(&text, "USN"),
        uuid: extract_uuid(&text),
        description: None,
    }
}

/// Finds the byte index of `needle` in `haystack` (ASCII case-insensitive,
/// no allocation). HTTP headers are ASCII, so byte comparison is safe.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Extracts the trimmed value of the first line of the form `<name>: <value>`.
///
/// The name comparison is exact but case-insensitive, so an `ST` lookup does
/// not fire on `NTS` lines. Values keep their embedded colons (URLs). A
/// missing header is an empty string, not an error.
fn header_value(text: &str, name: &str) -> String {
    for line in text.lines() {
        let line = line.trim();
        if let Some(colon) = line.find(':') {
            let (key, rest) = line.split_at(colon);
            if key.trim().eq_ignore_ascii_case(name) {
                return rest[1..].trim().to_string();
            }
        }
    }
    String::new()
}

/// Extracts the dotted-quad host of an `http://` URL inside `location`.
fn extract_ipv4(location: &str) -> String {
    let mut rest = location;
    while let Some(pos) = find_ignore_ascii_case(rest, "http://") {
        let candidate = &rest[pos + 7..];
        if let Some(ip) = leading_dotted_quad(candidate) {
            return ip;
        }
        rest = candidate;
    }
    String::new()
}

/// Matches a leading `d+.d+.d+.d+` run.
fn leading_dotted_quad(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut groups = 0;
    loop {
        let start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == start {
            return None;
        }
        groups += 1;
        if groups == 4 {
            return Some(s[..end].to_string());
        }
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
        } else {
            return None;
        }
    }
}

/// Extracts the token after the first `uuid:` marker anywhere in the reply
/// (commonly inside USN). Tokens are word characters and hyphens; anything
/// else ends the token. No marker means an empty string.
fn extract_uuid(text: &str) -> String {
    let mut rest = text;
    while let Some(pos) = find_ignore_ascii_case(rest, "uuid") {
        let after = &rest[pos + 4..];
        let trimmed = after.trim_start();
        if let Some(after_colon) = trimmed.strip_prefix(':') {
            let token = after_colon.trim_start();
            let end = token
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
                .unwrap_or(token.len());
            return token[..end].to_string();
        }
        rest = after;
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_msearch() {
        let msg = build_msearch("upnp:rootdevice", 2);
        assert!(msg.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(msg.contains("HOST: 239.255.255.250:1900\r\n"));
        assert!(msg.contains("MAN: \"ssdp:discover\"\r\n"));
        assert!(msg.contains("ST: upnp:rootdevice\r\n"));
        assert!(msg.contains("MX: 2\r\n"));
        assert!(msg.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_parse_reply_full() {
        let reply = "HTTP/1.1 200 OK\r\n\
                     CACHE-CONTROL: max-age=1800\r\n\
                     LOCATION: http://192.168.1.10:1400/desc.xml\r\n\
                     SERVER: Linux UPnP/1.0 Example/1.0\r\n\
                     ST: upnp:rootdevice\r\n\
                     USN: uuid:abc-123::upnp:rootdevice\r\n\r\n";
        let record = parse_reply(reply.as_bytes());
        assert_eq!(record.server, "Linux UPnP/1.0 Example/1.0");
        assert_eq!(record.location, "http://192.168.1.10:1400/desc.xml");
        assert_eq!(record.search_target, "upnp:rootdevice");
        assert_eq!(record.usn, "uuid:abc-123::upnp:rootdevice");
        assert_eq!(record.ip, "192.168.1.10");
        assert_eq!(record.uuid, "abc-123");
        assert!(record.description.is_none());
    }

    #[test]
    fn test_parse_reply_lowercase_headers_and_lf_endings() {
        // Some devices send lowercase headers and bare LF line endings
        let reply = "HTTP/1.1 200 OK\n\
                     location: http://10.0.0.7:80/desc.xml\n\
                     usn: UUID:DEAD-beef_01\n\n";
        let record = parse_reply(reply.as_bytes());
        assert_eq!(record.location, "http://10.0.0.7:80/desc.xml");
        assert_eq!(record.ip, "10.0.0.7");
        assert_eq!(record.uuid, "DEAD-beef_01");
    }

    #[test]
    fn test_parse_reply_missing_headers_degrade_to_empty() {
        let record = parse_reply(b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(record.server, "");
        assert_eq!(record.location, "");
        assert_eq!(record.search_target, "");
        assert_eq!(record.usn, "");
        assert_eq!(record.ip, "");
        assert_eq!(record.uuid, "");
    }

    #[test]
    fn test_parse_reply_keeps_raw_datagram() {
        let reply = b"HTTP/1.1 200 OK\r\nST: ssdp:all\r\n\r\n";
        let record = parse_reply(reply);
        assert_eq!(STANDARD.decode(&record.raw_response).unwrap(), reply);
    }

    #[test]
    fn test_header_value_requires_exact_name() {
        // An ST lookup must not fire on the NTS line
        let text = "NOTIFY * HTTP/1.1\r\nNTS: ssdp:alive\r\n\r\n";
        assert_eq!(header_value(text, "ST"), "");
    }

    #[test]
    fn test_header_value_tolerates_whitespace() {
        let text = "HTTP/1.1 200 OK\r\n  Location :   http://1.2.3.4/d.xml  \r\n\r\n";
        assert_eq!(header_value(text, "LOCATION"), "http://1.2.3.4/d.xml");
    }

    #[test]
    fn test_extract_ipv4_ignores_hostname_urls() {
        assert_eq!(extract_ipv4("http://device.local:80/desc.xml"), "");
        assert_eq!(extract_ipv4("http://192.168.0.254/desc.xml"), "192.168.0.254");
    }

    #[test]
    fn test_extract_uuid_skips_bare_mentions() {
        // "uuid" without a colon is not a marker; the real one follows
        let text = "SERVER: uuid capable\r\nUSN: uuid:real-one::urn:x\r\n";
        assert_eq!(extract_uuid(text), "real-one");
    }
}
