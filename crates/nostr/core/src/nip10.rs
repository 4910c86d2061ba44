//! NIP-10: reply threading from `e` and `p` tags.

use crate::nip19::{EventPointer, ProfilePointer};
use crate::tag_parsing::{relay_hint, tag_field, tags_named};

/// Thread position of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadReferences {
    /// Root of the thread.
    pub root: Option<EventPointer>,
    /// Direct parent this event replies to.
    pub reply: Option<EventPointer>,
    /// Events referenced outside the reply chain.
    pub mentions: Vec<EventPointer>,
    /// Pubkeys involved in the thread, in tag order.
    pub profiles: Vec<ProfilePointer>,
}

/// Parse thread references from an event's tags.
///
/// Marked `e` tags (`root`, `reply`, `mention`) are placed by marker. Unmarked
/// ones fall back to position: the first is the root, the last the reply, and
/// anything in between a mention.
pub fn parse(tags: &[Vec<String>]) -> ThreadReferences {
    let mut result = ThreadReferences {
        profiles: tags_named(tags, "p")
            .map(|tag| ProfilePointer {
                pubkey: tag[1].clone(),
                relays: relay_hint(tag),
            })
            .collect(),
        ..ThreadReferences::default()
    };

    let e_tags: Vec<&[String]> = tags_named(tags, "e").collect();
    let last = e_tags.len().saturating_sub(1);
    for (index, tag) in e_tags.into_iter().enumerate() {
        let pointer = EventPointer {
            id: tag[1].clone(),
            relays: relay_hint(tag),
            author: None,
        };
        match tag_field(tag, 3) {
            Some("root") => result.root = Some(pointer),
            Some("reply") => result.reply = Some(pointer),
            Some("mention") => result.mentions.push(pointer),
            _ if index == 0 => result.root = Some(pointer),
            _ if index == last => result.reply = Some(pointer),
            _ => result.mentions.push(pointer),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|tag| tag.iter().map(|s| (*s).to_string()).collect())
            .collect()
    }

    fn ids(pointers: &[EventPointer]) -> Vec<&str> {
        pointers.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn positional_tags() {
        let refs = parse(&tags(&[
            &["e", "root", "wss://a"],
            &["e", "m1"],
            &["e", "m2"],
            &["e", "parent"],
            &["p", "alice", "wss://b"],
            &["p", "bob"],
        ]));

        let root = refs.root.unwrap();
        assert_eq!(root.id, "root");
        assert_eq!(root.relays, vec!["wss://a".to_string()]);
        assert_eq!(refs.reply.unwrap().id, "parent");
        assert_eq!(ids(&refs.mentions), vec!["m1", "m2"]);
        assert_eq!(refs.profiles.len(), 2);
        assert_eq!(refs.profiles[0].relays, vec!["wss://b".to_string()]);
        assert!(refs.profiles[1].relays.is_empty());
    }

    #[test]
    fn single_positional_tag_is_root() {
        let refs = parse(&tags(&[&["e", "only"]]));
        assert_eq!(refs.root.unwrap().id, "only");
        assert!(refs.reply.is_none());
    }

    #[test]
    fn marked_tags() {
        let refs = parse(&tags(&[
            &["e", "parent", "", "reply"],
            &["e", "quoted", "", "mention"],
            &["e", "top", "wss://r", "root"],
        ]));

        assert_eq!(refs.root.unwrap().id, "top");
        let reply = refs.reply.unwrap();
        assert_eq!(reply.id, "parent");
        assert!(reply.relays.is_empty());
        assert_eq!(ids(&refs.mentions), vec!["quoted"]);
    }

    #[test]
    fn empty_values_are_ignored() {
        let refs = parse(&tags(&[&["e", ""], &["p"], &["t", "topic"]]));
        assert_eq!(refs, ThreadReferences::default());
    }
}
