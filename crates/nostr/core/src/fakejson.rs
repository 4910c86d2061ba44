//! Field extraction from raw relay frames without a full JSON parse.
//!
//! These scanners look for the first occurrence of a key and read what
//! follows it. They are a fast path for routing and deduplication; anything
//! that matters is re-checked after the frame is parsed properly.

/// The 64 characters following the first quote after `"field":`.
pub fn get_hex64<'a>(json: &'a str, field: &str) -> Option<&'a str> {
    let key = format!("\"{field}\":");
    let after = json.find(&key)? + key.len();
    let start = after + json.get(after..)?.find('"')? + 1;
    json.get(start..start + 64)
}

/// The integer following `"field":`, up to the next `,` or `}`.
pub fn get_int(json: &str, field: &str) -> Option<i64> {
    let key = format!("\"{field}\":");
    let after = json.find(&key)? + key.len();
    let rest = json.get(after..)?;
    let end = rest.find([',', '}'])?;
    rest[..end].trim().parse().ok()
}

/// Subscription id of an `["EVENT", "<id>", ...]` frame.
///
/// Only the first 22 bytes are searched for the `"EVENT"` marker and the id
/// must close before byte 80.
pub fn get_subscription_id(json: &str) -> Option<&str> {
    const MARKER: &[u8] = b"\"EVENT\"";

    let bytes = json.as_bytes();
    let head = &bytes[..bytes.len().min(22)];
    let idx = head
        .windows(MARKER.len())
        .position(|window| window == MARKER)?;

    let after = idx + MARKER.len() + 1;
    let start = after + bytes.get(after..)?.iter().position(|&b| b == b'"')?;
    let limit = bytes.len().min(80);
    let len = bytes
        .get(start + 1..limit)?
        .iter()
        .position(|&b| b == b'"')?;
    json.get(start + 1..start + 1 + len)
}

pub fn match_event_id(json: &str, id: &str) -> bool {
    get_hex64(json, "id") == Some(id)
}

pub fn match_event_pubkey(json: &str, pubkey: &str) -> bool {
    get_hex64(json, "pubkey") == Some(pubkey)
}

pub fn match_event_kind(json: &str, kind: u16) -> bool {
    get_int(json, "kind") == Some(i64::from(kind))
}
