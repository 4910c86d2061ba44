//! NIP-27: inline references in event content.
//!
//! Recognizes `nostr:<bech32>` mentions and the legacy `#[index]` form that
//! points into the event's own tags.

use std::sync::LazyLock;

use regex::Regex;

use crate::nip01::Event;
use crate::nip19::{self, AddressPointer, CodecError, EventPointer, Nip19, ProfilePointer};
use crate::tag_parsing::{relay_hint, tag_field, tag_name};

#[expect(clippy::expect_used)]
static MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bnostr:((?:note|npub|naddr|nevent|nprofile)1\w+)\b|#\[(\d+)\]")
        .expect("mention regex should compile")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    Profile(ProfilePointer),
    Event(EventPointer),
    Address(AddressPointer),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The matched text, e.g. `nostr:npub1...` or `#[0]`.
    pub text: String,
    pub target: ReferenceTarget,
}

/// Collect references from `event.content`, in order of appearance.
///
/// A `nostr:` mention that fails to decode fails the whole parse. Index
/// mentions pointing at a missing or unsupported tag are skipped.
pub fn parse_references(event: &Event) -> Result<Vec<Reference>, CodecError> {
    let mut references = Vec::new();
    for captures in MENTION_REGEX.captures_iter(&event.content) {
        let text = captures[0].to_string();
        let target = if let Some(bech32) = captures.get(1) {
            match nip19::decode(bech32.as_str())? {
                Nip19::Npub(pubkey) => ReferenceTarget::Profile(ProfilePointer {
                    pubkey,
                    relays: Vec::new(),
                }),
                Nip19::Profile(profile) => ReferenceTarget::Profile(profile),
                Nip19::Note(id) => ReferenceTarget::Event(EventPointer {
                    id,
                    relays: Vec::new(),
                    author: None,
                }),
                Nip19::Event(pointer) => ReferenceTarget::Event(pointer),
                Nip19::Address(addr) => ReferenceTarget::Address(addr),
                Nip19::Nsec(_) => continue,
            }
        } else {
            let Some(tag) = captures
                .get(2)
                .and_then(|index| index.as_str().parse::<usize>().ok())
                .and_then(|index| event.tags.get(index))
            else {
                continue;
            };
            match tag_target(tag) {
                Some(target) => target,
                None => continue,
            }
        };
        references.push(Reference { text, target });
    }
    Ok(references)
}

fn tag_target(tag: &[String]) -> Option<ReferenceTarget> {
    let value = tag.get(1).cloned().unwrap_or_default();
    match tag_name(tag)? {
        "p" => Some(ReferenceTarget::Profile(ProfilePointer {
            pubkey: value,
            relays: relay_hint(tag),
        })),
        "e" => Some(ReferenceTarget::Event(EventPointer {
            id: value,
            relays: relay_hint(tag),
            author: None,
        })),
        "a" => {
            let mut parts = tag_field(tag, 1)?.splitn(3, ':');
            let kind = parts.next().filter(|k| !k.is_empty())?;
            let pubkey = parts.next().filter(|p| !p.is_empty())?;
            let identifier = parts.next().filter(|i| !i.is_empty())?;
            let kind = kind.parse::<u32>().ok()?;
            Some(ReferenceTarget::Address(AddressPointer {
                identifier: identifier.to_string(),
                pubkey: pubkey.to_string(),
                kind,
                relays: relay_hint(tag),
            }))
        }
        _ => None,
    }
}
