//! NIP-19: bech32-encoded entities.
//!
//! Bare keys and ids (`nsec`, `npub`, `note`) carry a raw 32-byte payload.
//! Shareable pointers (`nprofile`, `nevent`, `naddr`) carry a TLV stream of
//! `(type: u8, length: u8, value)` records.

use std::collections::BTreeMap;
use std::str::FromStr;

use bech32::Hrp;
use bech32::primitives::checksum::Checksum;
use bech32::primitives::decode::CheckedHrpstring;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of an encoded identifier, in characters.
pub const BECH32_MAX_SIZE: usize = 5000;

const CHECKSUM_LENGTH: usize = 6;

pub const NSEC_PREFIX: &str = "nsec";
pub const NPUB_PREFIX: &str = "npub";
pub const NOTE_PREFIX: &str = "note";
pub const NPROFILE_PREFIX: &str = "nprofile";
pub const NEVENT_PREFIX: &str = "nevent";
pub const NADDR_PREFIX: &str = "naddr";

pub const TLV_SPECIAL: u8 = 0;
pub const TLV_RELAY: u8 = 1;
pub const TLV_AUTHOR: u8 = 2;
pub const TLV_KIND: u8 = 3;

/// Plain bech32 with the code length raised to [`BECH32_MAX_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NostrBech32 {}

impl Checksum for NostrBech32 {
    type MidstateRepr = u32;
    const CODE_LENGTH: usize = BECH32_MAX_SIZE;
    const CHECKSUM_LENGTH: usize = CHECKSUM_LENGTH;
    const GENERATOR_SH: [u32; 5] = [
        0x3b6a_57b2,
        0x2650_8e6d,
        0x1ea1_19fa,
        0x3d42_33dd,
        0x2a14_62b3,
    ];
    const TARGET_RESIDUE: u32 = 1;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("bech32 error: {0}")]
    Bech32(String),

    #[error("identifier is {0} characters, limit is {BECH32_MAX_SIZE}")]
    TooLong(usize),

    #[error("unknown prefix {0}")]
    UnknownPrefix(String),

    #[error("invalid TLV: record header is truncated")]
    InvalidTlv,

    #[error("TLV value of type {tlv_type} is {len} bytes, limit is 255")]
    ValueTooLong { tlv_type: u8, len: usize },

    #[error("missing TLV {tlv_type} ({field}) for {prefix}")]
    MissingField {
        prefix: &'static str,
        tlv_type: u8,
        field: &'static str,
    },

    #[error("TLV {tlv_type} ({field}) for {prefix} should be {expected} bytes, got {actual}")]
    InvalidLength {
        prefix: &'static str,
        tlv_type: u8,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{prefix} payload should be 32 bytes, got {actual}")]
    InvalidPayloadLength { prefix: &'static str, actual: usize },

    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePointer {
    pub pubkey: String,
    #[serde(default)]
    pub relays: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPointer {
    pub id: String,
    #[serde(default)]
    pub relays: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPointer {
    pub identifier: String,
    pub pubkey: String,
    pub kind: u32,
    #[serde(default)]
    pub relays: Vec<String>,
}

/// A decoded NIP-19 entity. Keys and ids are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nip19 {
    Nsec(String),
    Npub(String),
    Note(String),
    Profile(ProfilePointer),
    Event(EventPointer),
    Address(AddressPointer),
}

impl Nip19 {
    pub fn prefix(&self) -> &'static str {
        match self {
            Nip19::Nsec(_) => NSEC_PREFIX,
            Nip19::Npub(_) => NPUB_PREFIX,
            Nip19::Note(_) => NOTE_PREFIX,
            Nip19::Profile(_) => NPROFILE_PREFIX,
            Nip19::Event(_) => NEVENT_PREFIX,
            Nip19::Address(_) => NADDR_PREFIX,
        }
    }

    pub fn encode(&self) -> Result<String, CodecError> {
        match self {
            Nip19::Nsec(hex) => nsec_encode(hex),
            Nip19::Npub(hex) => npub_encode(hex),
            Nip19::Note(hex) => note_encode(hex),
            Nip19::Profile(profile) => nprofile_encode(profile),
            Nip19::Event(event) => nevent_encode(event),
            Nip19::Address(addr) => naddr_encode(addr),
        }
    }
}

impl FromStr for Nip19 {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// TLV values grouped by type, in stream order within each type.
pub type Tlv = BTreeMap<u8, Vec<Vec<u8>>>;

/// Parse a TLV stream.
///
/// Unknown types are collected. A final record whose declared length runs
/// past the end of the buffer is dropped rather than rejected; only a record
/// missing its length byte fails the parse.
pub fn parse_tlv(data: &[u8]) -> Result<Tlv, CodecError> {
    let mut result = Tlv::new();
    let mut rest = data;
    while let Some((&tlv_type, tail)) = rest.split_first() {
        let (&len, tail) = tail.split_first().ok_or(CodecError::InvalidTlv)?;
        let len = usize::from(len);
        if tail.len() < len {
            break;
        }
        let (value, tail) = tail.split_at(len);
        result.entry(tlv_type).or_default().push(value.to_vec());
        rest = tail;
    }
    Ok(result)
}

/// Serialize records in ascending type order.
pub fn encode_tlv(tlv: &Tlv) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for (&tlv_type, values) in tlv {
        for value in values {
            let len = u8::try_from(value.len()).map_err(|_| CodecError::ValueTooLong {
                tlv_type,
                len: value.len(),
            })?;
            out.push(tlv_type);
            out.push(len);
            out.extend_from_slice(value);
        }
    }
    Ok(out)
}

pub fn decode(value: &str) -> Result<Nip19, CodecError> {
    if value.len() > BECH32_MAX_SIZE {
        return Err(CodecError::TooLong(value.len()));
    }
    let checked = CheckedHrpstring::new::<NostrBech32>(value)
        .map_err(|e| CodecError::Bech32(e.to_string()))?;
    let prefix = checked.hrp().to_lowercase();
    let data: Vec<u8> = checked.byte_iter().collect();

    match prefix.as_str() {
        NPROFILE_PREFIX => nprofile_decode(&data).map(Nip19::Profile),
        NEVENT_PREFIX => nevent_decode(&data).map(Nip19::Event),
        NADDR_PREFIX => naddr_decode(&data).map(Nip19::Address),
        NSEC_PREFIX => raw_decode(NSEC_PREFIX, &data).map(Nip19::Nsec),
        NPUB_PREFIX => raw_decode(NPUB_PREFIX, &data).map(Nip19::Npub),
        NOTE_PREFIX => raw_decode(NOTE_PREFIX, &data).map(Nip19::Note),
        _ => Err(CodecError::UnknownPrefix(prefix)),
    }
}

fn raw_decode(prefix: &'static str, data: &[u8]) -> Result<String, CodecError> {
    if data.len() != 32 {
        return Err(CodecError::InvalidPayloadLength {
            prefix,
            actual: data.len(),
        });
    }
    Ok(hex::encode(data))
}

fn nprofile_decode(data: &[u8]) -> Result<ProfilePointer, CodecError> {
    let tlv = parse_tlv(data)?;
    let pubkey = required(&tlv, NPROFILE_PREFIX, TLV_SPECIAL, "pubkey")?;
    Ok(ProfilePointer {
        pubkey: hex32_field(NPROFILE_PREFIX, TLV_SPECIAL, "pubkey", pubkey)?,
        relays: relays(&tlv),
    })
}

fn nevent_decode(data: &[u8]) -> Result<EventPointer, CodecError> {
    let tlv = parse_tlv(data)?;
    let id = required(&tlv, NEVENT_PREFIX, TLV_SPECIAL, "id")?;
    let author = first(&tlv, TLV_AUTHOR)
        .map(|author| hex32_field(NEVENT_PREFIX, TLV_AUTHOR, "author", author))
        .transpose()?;
    Ok(EventPointer {
        id: hex32_field(NEVENT_PREFIX, TLV_SPECIAL, "id", id)?,
        relays: relays(&tlv),
        author,
    })
}

fn naddr_decode(data: &[u8]) -> Result<AddressPointer, CodecError> {
    let tlv = parse_tlv(data)?;
    let identifier = required(&tlv, NADDR_PREFIX, TLV_SPECIAL, "identifier")?;
    let pubkey = required(&tlv, NADDR_PREFIX, TLV_AUTHOR, "pubkey")?;
    let pubkey = hex32_field(NADDR_PREFIX, TLV_AUTHOR, "pubkey", pubkey)?;
    let kind = required(&tlv, NADDR_PREFIX, TLV_KIND, "kind")?;
    let kind = <[u8; 4]>::try_from(kind).map_err(|_| CodecError::InvalidLength {
        prefix: NADDR_PREFIX,
        tlv_type: TLV_KIND,
        field: "kind",
        expected: 4,
        actual: kind.len(),
    })?;
    Ok(AddressPointer {
        identifier: String::from_utf8_lossy(identifier).into_owned(),
        pubkey,
        kind: u32::from_be_bytes(kind),
        relays: relays(&tlv),
    })
}

fn first(tlv: &Tlv, tlv_type: u8) -> Option<&[u8]> {
    tlv.get(&tlv_type)
        .and_then(|values| values.first())
        .map(Vec::as_slice)
}

fn required<'a>(
    tlv: &'a Tlv,
    prefix: &'static str,
    tlv_type: u8,
    field: &'static str,
) -> Result<&'a [u8], CodecError> {
    first(tlv, tlv_type).ok_or(CodecError::MissingField {
        prefix,
        tlv_type,
        field,
    })
}

fn hex32_field(
    prefix: &'static str,
    tlv_type: u8,
    field: &'static str,
    value: &[u8],
) -> Result<String, CodecError> {
    if value.len() != 32 {
        return Err(CodecError::InvalidLength {
            prefix,
            tlv_type,
            field,
            expected: 32,
            actual: value.len(),
        });
    }
    Ok(hex::encode(value))
}

fn relays(tlv: &Tlv) -> Vec<String> {
    tlv.get(&TLV_RELAY)
        .map(|values| {
            values
                .iter()
                .map(|relay| String::from_utf8_lossy(relay).into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn decode_hex32(field: &'static str, value: &str) -> Result<Vec<u8>, CodecError> {
    let bytes = hex::decode(value).map_err(|e| CodecError::InvalidHex {
        field,
        reason: e.to_string(),
    })?;
    if bytes.len() != 32 {
        return Err(CodecError::InvalidHex {
            field,
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        });
    }
    Ok(bytes)
}

pub(crate) fn encode_bech32(prefix: &str, data: &[u8]) -> Result<String, CodecError> {
    let groups = (data.len() * 8).div_ceil(5);
    let total = prefix.len() + 1 + groups + CHECKSUM_LENGTH;
    if total > BECH32_MAX_SIZE {
        return Err(CodecError::TooLong(total));
    }
    let hrp = Hrp::parse(prefix).map_err(|e| CodecError::Bech32(e.to_string()))?;
    bech32::encode::<NostrBech32>(hrp, data).map_err(|e| CodecError::Bech32(e.to_string()))
}

pub fn nsec_encode(secret_key_hex: &str) -> Result<String, CodecError> {
    encode_bech32(NSEC_PREFIX, &decode_hex32("secret key", secret_key_hex)?)
}

pub fn npub_encode(pubkey_hex: &str) -> Result<String, CodecError> {
    encode_bech32(NPUB_PREFIX, &decode_hex32("pubkey", pubkey_hex)?)
}

pub fn note_encode(event_id_hex: &str) -> Result<String, CodecError> {
    encode_bech32(NOTE_PREFIX, &decode_hex32("event id", event_id_hex)?)
}

pub fn nprofile_encode(profile: &ProfilePointer) -> Result<String, CodecError> {
    let mut tlv = Tlv::new();
    tlv.insert(TLV_SPECIAL, vec![decode_hex32("pubkey", &profile.pubkey)?]);
    tlv.insert(TLV_RELAY, relay_values(&profile.relays));
    encode_bech32(NPROFILE_PREFIX, &encode_tlv(&tlv)?)
}

pub fn nevent_encode(event: &EventPointer) -> Result<String, CodecError> {
    let mut tlv = Tlv::new();
    tlv.insert(TLV_SPECIAL, vec![decode_hex32("id", &event.id)?]);
    tlv.insert(TLV_RELAY, relay_values(&event.relays));
    if let Some(author) = &event.author {
        tlv.insert(TLV_AUTHOR, vec![decode_hex32("author", author)?]);
    }
    encode_bech32(NEVENT_PREFIX, &encode_tlv(&tlv)?)
}

pub fn naddr_encode(addr: &AddressPointer) -> Result<String, CodecError> {
    let mut tlv = Tlv::new();
    tlv.insert(TLV_SPECIAL, vec![addr.identifier.as_bytes().to_vec()]);
    tlv.insert(TLV_RELAY, relay_values(&addr.relays));
    tlv.insert(TLV_AUTHOR, vec![decode_hex32("pubkey", &addr.pubkey)?]);
    tlv.insert(TLV_KIND, vec![addr.kind.to_be_bytes().to_vec()]);
    encode_bech32(NADDR_PREFIX, &encode_tlv(&tlv)?)
}

fn relay_values(relays: &[String]) -> Vec<Vec<u8>> {
    relays.iter().map(|relay| relay.as_bytes().to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEY: &str = "97c70a44366a6535c145b333f973ea86dfdc2d7a99da618c40c64705ad98e322";
    const RELAYS: [&str; 2] = [
        "wss://relay.nostr.example.mydomain.example.com",
        "wss://nostr.banana.com",
    ];

    fn relays() -> Vec<String> {
        RELAYS.iter().map(|r| (*r).to_string()).collect()
    }

    #[test]
    fn npub_and_nsec_vectors() -> Result<(), CodecError> {
        let npub = "npub1zutzeysacnf9rru6zqwmxd54mud0k44tst6l70ja5mhv8jjumytsd2x7nu";
        let pubkey = "17162c921dc4d2518f9a101db33695df1afb56ab82f5ff3e5da6eec3ca5cd917";
        assert_eq!(npub_encode(pubkey)?, npub);
        assert_eq!(decode(npub)?, Nip19::Npub(pubkey.to_string()));

        let nsec = "nsec10allq0gjx7fddtzef0ax00mdps9t2kmtrldkyjfs8l5xruwvh2dq0lhhkp";
        let secret = "7f7ff03d123792d6ac594bfa67bf6d0c0ab55b6b1fdb6249303fe861f1ccba9a";
        assert_eq!(nsec_encode(secret)?, nsec);
        assert_eq!(decode(nsec)?, Nip19::Nsec(secret.to_string()));
        Ok(())
    }

    #[test]
    fn note_round_trip() -> Result<(), CodecError> {
        let note = note_encode(PUBKEY)?;
        assert!(note.starts_with("note1"));
        assert_eq!(note.parse::<Nip19>()?, Nip19::Note(PUBKEY.to_string()));
        Ok(())
    }

    #[test]
    fn nprofile_round_trip() -> Result<(), CodecError> {
        let profile = ProfilePointer {
            pubkey: PUBKEY.to_string(),
            relays: relays(),
        };
        let encoded = nprofile_encode(&profile)?;
        assert!(encoded.starts_with("nprofile1"));
        assert_eq!(decode(&encoded)?, Nip19::Profile(profile));
        Ok(())
    }

    #[test]
    fn nprofile_without_relays() -> Result<(), CodecError> {
        let profile = ProfilePointer {
            pubkey: PUBKEY.to_string(),
            relays: vec![],
        };
        assert_eq!(
            decode(&nprofile_encode(&profile)?)?,
            Nip19::Profile(profile)
        );
        Ok(())
    }

    #[test]
    fn nevent_round_trip_with_and_without_author() -> Result<(), CodecError> {
        let with_author = EventPointer {
            id: PUBKEY.to_string(),
            relays: relays(),
            author: Some(
                "17162c921dc4d2518f9a101db33695df1afb56ab82f5ff3e5da6eec3ca5cd917".to_string(),
            ),
        };
        assert_eq!(
            decode(&nevent_encode(&with_author)?)?,
            Nip19::Event(with_author)
        );

        let bare = EventPointer {
            id: PUBKEY.to_string(),
            relays: vec![],
            author: None,
        };
        assert_eq!(decode(&nevent_encode(&bare)?)?, Nip19::Event(bare));
        Ok(())
    }

    #[test]
    fn naddr_round_trip() -> Result<(), CodecError> {
        let addr = AddressPointer {
            identifier: "banana".to_string(),
            pubkey: PUBKEY.to_string(),
            kind: 30023,
            relays: relays(),
        };
        let encoded = naddr_encode(&addr)?;
        assert!(encoded.starts_with("naddr1"));
        assert_eq!(decode(&encoded)?, Nip19::Address(addr.clone()));
        assert_eq!(Nip19::Address(addr).encode()?, encoded);
        Ok(())
    }

    #[test]
    fn naddr_with_empty_identifier() -> Result<(), CodecError> {
        let addr = AddressPointer {
            identifier: String::new(),
            pubkey: PUBKEY.to_string(),
            kind: 10002,
            relays: vec![],
        };
        assert_eq!(decode(&naddr_encode(&addr)?)?, Nip19::Address(addr));
        Ok(())
    }

    #[test]
    fn naddr_from_habla() -> Result<(), CodecError> {
        let decoded = decode(
            "naddr1qq98yetxv4ex2mnrv4esygrl54h466tz4v0re4pyuavvxqptsejl0vxcmnhfl60z3rth2xkpjspsgqqqw4rsf34vl5",
        )?;
        let addr = match decoded {
            Nip19::Address(addr) => addr,
            other => panic!("expected naddr, got {other:?}"),
        };
        assert_eq!(
            addr.pubkey,
            "7fa56f5d6962ab1e3cd424e758c3002b8665f7b0d8dcee9fe9e288d7751ac194"
        );
        assert_eq!(addr.kind, 30023);
        assert_eq!(addr.identifier, "references");
        Ok(())
    }

    #[test]
    fn naddr_with_different_tlv_ordering() -> Result<(), CodecError> {
        let decoded = decode(
            "naddr1qqrxyctwv9hxzq3q80cvv07tjdrrgpa0j7j7tmnyl2yr6yr7l8j4s3evf6u64th6gkwsxpqqqp65wqfwwaehxw309aex2mrp0yhxummnw3ezuetcv9khqmr99ekhjer0d4skjm3wv4uxzmtsd3jjucm0d5q3vamnwvaz7tmwdaehgu3wvfskuctwvyhxxmmd0zfmwx",
        )?;
        let addr = match decoded {
            Nip19::Address(addr) => addr,
            other => panic!("expected naddr, got {other:?}"),
        };
        assert_eq!(
            addr.pubkey,
            "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d"
        );
        assert_eq!(addr.relays, relays());
        assert_eq!(addr.kind, 30023);
        assert_eq!(addr.identifier, "banana");
        Ok(())
    }

    #[test]
    fn naddr_missing_kind_names_the_field() -> Result<(), CodecError> {
        let mut tlv = Tlv::new();
        tlv.insert(TLV_SPECIAL, vec![b"banana".to_vec()]);
        tlv.insert(TLV_AUTHOR, vec![hex::decode(PUBKEY).unwrap_or_default()]);
        let encoded = encode_bech32(NADDR_PREFIX, &encode_tlv(&tlv)?)?;

        let err = decode(&encoded).unwrap_err();
        assert_eq!(
            err,
            CodecError::MissingField {
                prefix: NADDR_PREFIX,
                tlv_type: TLV_KIND,
                field: "kind",
            }
        );
        assert!(err.to_string().contains("kind"));
        Ok(())
    }

    #[test]
    fn wrong_length_pubkey_is_rejected() -> Result<(), CodecError> {
        let mut tlv = Tlv::new();
        tlv.insert(TLV_SPECIAL, vec![vec![7u8; 31]]);
        let encoded = encode_bech32(NPROFILE_PREFIX, &encode_tlv(&tlv)?)?;

        assert!(matches!(
            decode(&encoded),
            Err(CodecError::InvalidLength {
                field: "pubkey",
                expected: 32,
                actual: 31,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn wrong_length_nevent_author_is_rejected() -> Result<(), CodecError> {
        let mut tlv = Tlv::new();
        tlv.insert(TLV_SPECIAL, vec![vec![1u8; 32]]);
        tlv.insert(TLV_AUTHOR, vec![vec![2u8; 33]]);
        let encoded = encode_bech32(NEVENT_PREFIX, &encode_tlv(&tlv)?)?;

        assert!(matches!(
            decode(&encoded),
            Err(CodecError::InvalidLength { field: "author", .. })
        ));
        Ok(())
    }

    #[test]
    fn raw_payload_must_be_32_bytes() -> Result<(), CodecError> {
        let encoded = encode_bech32(NPUB_PREFIX, &[1u8; 20])?;
        assert_eq!(
            decode(&encoded),
            Err(CodecError::InvalidPayloadLength {
                prefix: NPUB_PREFIX,
                actual: 20,
            })
        );
        Ok(())
    }

    #[test]
    fn truncated_trailing_record_is_dropped() -> Result<(), CodecError> {
        let mut data = vec![0u8, 32];
        data.extend_from_slice(&[9u8; 32]);
        data.extend_from_slice(&[1, 40, b'w', b's', b's']);

        let tlv = parse_tlv(&data)?;
        assert_eq!(tlv.len(), 1);
        assert_eq!(tlv[&0], vec![vec![9u8; 32]]);

        let encoded = encode_bech32(NPROFILE_PREFIX, &data)?;
        let profile = match decode(&encoded)? {
            Nip19::Profile(profile) => profile,
            other => panic!("expected nprofile, got {other:?}"),
        };
        assert!(profile.relays.is_empty());
        Ok(())
    }

    #[test]
    fn lone_type_byte_is_invalid() {
        assert_eq!(parse_tlv(&[0, 1, 5, 1]), Err(CodecError::InvalidTlv));
    }

    #[test]
    fn unknown_types_are_collected() -> Result<(), CodecError> {
        let tlv = parse_tlv(&[9, 1, 0xaa, 9, 0, 0, 2, 1, 2])?;
        assert_eq!(tlv[&9], vec![vec![0xaa], vec![]]);
        assert_eq!(tlv[&0], vec![vec![1, 2]]);
        Ok(())
    }

    #[test]
    fn oversized_tlv_value_is_rejected() {
        let mut tlv = Tlv::new();
        tlv.insert(TLV_RELAY, vec![vec![b'a'; 256]]);
        assert_eq!(
            encode_tlv(&tlv),
            Err(CodecError::ValueTooLong {
                tlv_type: TLV_RELAY,
                len: 256,
            })
        );
    }

    #[test]
    fn encoding_past_the_ceiling_fails() {
        let relay = format!("wss://{}.example.com", "r".repeat(200));
        let profile = ProfilePointer {
            pubkey: PUBKEY.to_string(),
            relays: vec![relay; 20],
        };
        assert!(matches!(
            nprofile_encode(&profile),
            Err(CodecError::TooLong(_))
        ));
    }

    #[test]
    fn long_identifiers_below_the_ceiling_round_trip() -> Result<(), CodecError> {
        let relay = format!("wss://{}.example.com", "r".repeat(200));
        let profile = ProfilePointer {
            pubkey: PUBKEY.to_string(),
            relays: vec![relay; 8],
        };
        let encoded = nprofile_encode(&profile)?;
        assert!(encoded.len() > 1023);
        assert_eq!(decode(&encoded)?, Nip19::Profile(profile));
        Ok(())
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(matches!(
            decode("npub1invalid"),
            Err(CodecError::Bech32(_))
        ));
        assert!(matches!(
            npub_encode("not hex"),
            Err(CodecError::InvalidHex { .. })
        ));
        assert!(matches!(
            decode(&"a".repeat(BECH32_MAX_SIZE + 1)),
            Err(CodecError::TooLong(_))
        ));
    }

    #[test]
    fn unknown_prefix() -> Result<(), CodecError> {
        let encoded = encode_bech32("nrelay", b"wss://relay.example.com")?;
        assert_eq!(
            decode(&encoded),
            Err(CodecError::UnknownPrefix("nrelay".to_string()))
        );
        Ok(())
    }

    #[test]
    fn pointers_serialize_as_json() -> Result<(), serde_json::Error> {
        let pointer = EventPointer {
            id: PUBKEY.to_string(),
            relays: vec![],
            author: None,
        };
        assert_eq!(
            serde_json::to_string(&pointer)?,
            format!(r#"{{"id":"{PUBKEY}","relays":[]}}"#)
        );
        Ok(())
    }
}
