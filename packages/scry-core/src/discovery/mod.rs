//! SSDP/UPnP device discovery.
//!
//! This module provides the query modes built on top of the M-SEARCH
//! engine:
//!
//! - [`get_all_devices`] - every SSDP reply on the network, undeduplicated
//! - [`get_all_root_devices`] - root devices only, one per UUID, described
//! - [`get_devices_by_urn`] - replies for a custom search target, described
//! - [`get_device_by_uuid`] - the single device answering `uuid:<uuid>`
//!
//! Each call is stateless and independent: it owns one UDP socket for its
//! duration, builds its reply list from scratch and shares nothing with
//! concurrent calls. "No devices responded" is an explicit `None` outcome,
//! distinct from the transport errors carried in [`DiscoveryError`].

pub mod ssdp;
pub mod types;

pub use types::{DeviceRecord, DiscoveryError, DiscoveryResult};

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::description;

/// Default receive window for the bulk queries (all devices, root devices).
pub const DEFAULT_BULK_WINDOW: Duration = Duration::from_secs(2);

/// Default receive window for the targeted queries (by URN, by UUID).
pub const DEFAULT_TARGETED_WINDOW: Duration = Duration::from_secs(1);

/// Search target matching every SSDP device and service.
pub const ST_ALL: &str = "ssdp:all";

/// Search target matching root devices only.
pub const ST_ROOT_DEVICE: &str = "upnp:rootdevice";

/// Upper bound on description fetches in flight during one pass, so a
/// burst of discovered devices does not overwhelm a weak LAN segment.
const MAX_CONCURRENT_FETCHES: usize = 8;

/// Fetches every SSDP reply on the network, sorted by IP.
///
/// Bulk mode: hundreds of replies are possible and most devices answer an
/// `ssdp:all` search once per advertised type, so the list is returned
/// undeduplicated and descriptions are never fetched.
pub async fn get_all_devices(
    window: Duration,
    mx: Option<u64>,
) -> DiscoveryResult<Option<Vec<DeviceRecord>>> {
    let replies = ssdp::search(ST_ALL, window, mx).await?;
    Ok(non_empty(sort_by_ip(replies)))
}

/// Fetches the root devices on the network, one record per UUID, each with
/// its description attached, sorted by IP.
///
/// This is the clean list of "main" devices: service and embedded-device
/// replies are filtered out, duplicates collapse to the first-seen reply.
pub async fn get_all_root_devices(
    window: Duration,
    mx: Option<u64>,
) -> DiscoveryResult<Option<Vec<DeviceRecord>>> {
    let replies = ssdp::search(ST_ROOT_DEVICE, window, mx).await?;
    let roots = dedup_root_devices(replies);
    let described = attach_descriptions(roots).await;
    Ok(non_empty(sort_by_ip(described)))
}

/// Fetches the devices answering a custom URN search target, each with its
/// description attached, sorted by IP.
pub async fn get_devices_by_urn(
    urn: &str,
    window: Duration,
    mx: Option<u64>,
) -> DiscoveryResult<Option<Vec<DeviceRecord>>> {
    let replies = ssdp::search(urn, window, mx).await?;
    let described = attach_descriptions(replies).await;
    Ok(non_empty(sort_by_ip(described)))
}

/// Fetches the single device with the given UUID, description attached.
///
/// UUIDs are nominally unique per device; on a collision the first reply
/// wins and the conflict is not reported.
pub async fn get_device_by_uuid(
    uuid: &str,
    window: Duration,
    mx: Option<u64>,
) -> DiscoveryResult<Option<DeviceRecord>> {
    let st = format!("uuid:{}", uuid);
    let replies = ssdp::search(&st, window, mx).await?;
    let Some(first) = replies.into_iter().next() else {
        return Ok(None);
    };
    let mut described = attach_descriptions(vec![first]).await;
    Ok(described.pop())
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps root-device replies only, one per UUID (first seen wins).
///
/// Only replies whose ST literally equals `upnp:rootdevice` survive.
/// Replies with no parsable UUID all share the empty-string key, so they
/// also collapse to one.
fn dedup_root_devices(replies: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    let mut seen = HashSet::new();
    replies
        .into_iter()
        .filter(|r| r.search_target == ST_ROOT_DEVICE)
        .filter(|r| seen.insert(r.uuid.clone()))
        .collect()
}

/// Fetches and attaches the description document for every record.
///
/// Fetches are independent per record and run concurrently, bounded by
/// [`MAX_CONCURRENT_FETCHES`]; results come back in input order so the
/// stable sort afterwards still sees arrival order.
async fn attach_descriptions(records: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    let client = description::build_client();
    stream::iter(records)
        .map(|mut record| {
            let client = client.clone();
            async move {
                record.description = description::fetch(&client, &record.location).await;
                record
            }
        })
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await
}

/// Sorts ascending by the final octet of each record's IP.
///
/// Only the last dot-separated number is compared, so 10.0.0.9 sorts after
/// 192.168.1.3. An unparsable IP compares as 0. The sort is stable: equal
/// octets keep arrival order.
fn sort_by_ip(mut records: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    records.sort_by_key(|r| last_octet(&r.ip));
    records
}

fn last_octet(ip: &str) -> u32 {
    ip.rsplit('.')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Maps an empty result list to the explicit "no devices" outcome.
fn non_empty(records: Vec<DeviceRecord>) -> Option<Vec<DeviceRecord>> {
    if records.is_empty() {
        None
    } else {
        Some(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ip: &str, uuid: &str, st: &str) -> DeviceRecord {
        DeviceRecord {
            raw_response: String::new(),
            server: String::new(),
            location: String::new(),
            search_target: st.to_string(),
            usn: format!("uuid:{}::{}", uuid, st),
            ip: ip.to_string(),
            uuid: uuid.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_dedup_keeps_first_seen_per_uuid() {
        let replies = vec![
            record("192.168.1.50", "abc", ST_ROOT_DEVICE),
            record("192.168.1.5", "abc", ST_ROOT_DEVICE),
        ];
        let deduped = dedup_root_devices(replies);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].ip, "192.168.1.50");
    }

    #[test]
    fn test_dedup_filters_non_root_replies() {
        let replies = vec![
            record("192.168.1.50", "abc", "urn:schemas-upnp-org:service:AVTransport:1"),
            record("192.168.1.51", "def", ST_ROOT_DEVICE),
        ];
        let deduped = dedup_root_devices(replies);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].uuid, "def");
    }

    #[test]
    fn test_dedup_collapses_uuidless_replies() {
        let replies = vec![
            record("192.168.1.50", "", ST_ROOT_DEVICE),
            record("192.168.1.51", "", ST_ROOT_DEVICE),
        ];
        assert_eq!(dedup_root_devices(replies).len(), 1);
    }

    #[test]
    fn test_sort_compares_final_octet_only() {
        let sorted = sort_by_ip(vec![
            record("192.168.1.20", "a", ST_ALL),
            record("192.168.1.3", "b", ST_ALL),
            record("192.168.1.100", "c", ST_ALL),
        ]);
        let octets: Vec<&str> = sorted.iter().map(|r| r.ip.as_str()).collect();
        assert_eq!(octets, vec!["192.168.1.3", "192.168.1.20", "192.168.1.100"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let sorted = sort_by_ip(vec![
            record("10.0.0.7", "first", ST_ALL),
            record("192.168.1.7", "second", ST_ALL),
        ]);
        assert_eq!(sorted[0].uuid, "first");
        assert_eq!(sorted[1].uuid, "second");
    }

    #[test]
    fn test_sort_treats_unparsable_ip_as_zero() {
        let sorted = sort_by_ip(vec![
            record("192.168.1.20", "a", ST_ALL),
            record("", "b", ST_ALL),
        ]);
        assert_eq!(sorted[0].uuid, "b");
    }

    #[tokio::test]
    async fn test_attach_descriptions_degrades_per_record() {
        // No LOCATION means nothing to fetch; the record survives untouched.
        let described = attach_descriptions(vec![record("192.168.1.9", "abc", ST_ROOT_DEVICE)]).await;
        assert_eq!(described.len(), 1);
        assert!(described[0].description.is_none());
        assert_eq!(described[0].uuid, "abc");
    }

    #[test]
    fn test_non_empty_sentinel() {
        assert!(non_empty(vec![]).is_none());
        assert_eq!(non_empty(vec![record("1.2.3.4", "x", ST_ALL)]).map(|v| v.len()), Some(1));
    }
}
