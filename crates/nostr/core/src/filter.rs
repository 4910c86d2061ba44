//! Subscription filters and local filter evaluation.
//!
//! A filter constrains events along several axes. Absent fields impose no
//! constraint; present fields are ANDed together. A list of filters matches
//! when any one of them does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::nip01::{Event, ValidationError};

/// Filter for subscription requests (the JSON object carried in `REQ`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    /// Inclusive lower bound on `created_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,

    /// Exclusive upper bound on `created_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,

    /// Advisory; relays enforce it, local matching ignores it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// NIP-50 full-text query. Relays evaluate it; local matching ignores it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Generic tag queries keyed as they appear on the wire (`"#e"`, `"#p"`).
    #[serde(flatten)]
    pub tags: BTreeMap<String, Vec<String>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u16>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn authors(mut self, authors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    pub fn since(mut self, timestamp: u64) -> Self {
        self.since = Some(timestamp);
        self
    }

    pub fn until(mut self, timestamp: u64) -> Self {
        self.until = Some(timestamp);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    /// Add a tag filter. `name` is the tag letter without `#` (e.g. `'e'`).
    pub fn tag(mut self, name: char, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.insert(
            format!("#{name}"),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Filter by `#e` (event reference) tags.
    pub fn event_refs(self, event_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tag('e', event_ids)
    }

    /// Filter by `#p` (pubkey reference) tags.
    pub fn pubkey_refs(self, pubkeys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tag('p', pubkeys)
    }

    /// Tag filters as `(tag name, accepted values)`.
    pub fn tag_filters(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tags
            .iter()
            .filter_map(|(key, values)| Some((key.strip_prefix('#')?, values.as_slice())))
    }

    /// Reject tag-filter keys that are not `#` followed by exactly one character.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for key in self.tags.keys() {
            let mut name = key
                .strip_prefix('#')
                .ok_or_else(|| ValidationError::InvalidFilter(format!("unknown field {key:?}")))?
                .chars();
            if name.next().is_none() || name.next().is_some() {
                return Err(ValidationError::InvalidFilter(format!(
                    "tag filter {key:?} must name a single-character tag"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, event: &Event) -> bool {
        match_filter(self, event)
    }
}

/// Evaluate one filter against an event.
pub fn match_filter(filter: &Filter, event: &Event) -> bool {
    if let Some(ids) = &filter.ids
        && !ids.contains(&event.id)
    {
        return false;
    }

    if let Some(kinds) = &filter.kinds
        && !kinds.contains(&event.kind)
    {
        return false;
    }

    if let Some(authors) = &filter.authors
        && !authors.contains(&event.pubkey)
    {
        return false;
    }

    for (name, values) in filter.tag_filters() {
        let tagged = event.tags.iter().any(|tag| {
            tag.first().is_some_and(|t| t == name)
                && tag.get(1).is_some_and(|value| values.contains(value))
        });
        if !tagged {
            return false;
        }
    }

    if let Some(since) = filter.since
        && event.created_at < since
    {
        return false;
    }

    if let Some(until) = filter.until
        && event.created_at >= until
    {
        return false;
    }

    true
}

/// True when at least one filter matches. An empty list matches nothing.
pub fn match_filters(filters: &[Filter], event: &Event) -> bool {
    filters.iter().any(|filter| match_filter(filter, event))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            id: "123".to_string(),
            pubkey: "abc".to_string(),
            created_at: 150,
            kind: 1,
            tags: vec![vec!["tag".to_string(), "value".to_string()]],
            content: String::new(),
            sig: String::new(),
        }
    }

    fn tagged(tags: &[&[&str]]) -> Event {
        Event {
            tags: tags
                .iter()
                .map(|tag| tag.iter().map(|s| (*s).to_string()).collect())
                .collect(),
            ..event()
        }
    }

    fn filter_json(value: serde_json::Value) -> Result<Filter, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn all_conditions_met() -> Result<(), serde_json::Error> {
        let filter = filter_json(serde_json::json!({
            "ids": ["123", "456"],
            "kinds": [1, 2, 3],
            "authors": ["abc"],
            "since": 100,
            "until": 200,
            "#tag": ["value"],
        }))?;
        assert!(match_filter(&filter, &event()));
        assert!(!match_filter(&filter, &Event { kind: 4, ..event() }));
        Ok(())
    }

    #[test]
    fn malformed_filter_json_is_rejected() {
        assert!(filter_json(serde_json::json!({"kinds": "1"})).is_err());
        assert!(filter_json(serde_json::json!({"since": -1})).is_err());
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(match_filter(&Filter::new(), &event()));
        assert!(match_filter(&Filter::new(), &tagged(&[])));
    }

    #[test]
    fn scalar_membership() {
        let e = Event {
            id: "789".to_string(),
            ..event()
        };
        assert!(!match_filter(&Filter::new().ids(["123", "456"]), &e));
        assert!(!match_filter(&Filter::new().kinds([2, 3]), &event()));
        assert!(!match_filter(&Filter::new().authors(["def", "ghi"]), &event()));
        assert!(match_filter(&Filter::new().authors(["def", "abc"]), &event()));
    }

    #[test]
    fn ids_are_exact_not_prefix() {
        let e = Event {
            id: "123456".to_string(),
            ..event()
        };
        assert!(!match_filter(&Filter::new().ids(["123"]), &e));
    }

    #[test]
    fn tag_filters() -> Result<(), serde_json::Error> {
        let filter = filter_json(serde_json::json!({"#tag": ["value"]}))?;
        assert!(match_filter(&filter, &tagged(&[&["tag", "value"]])));
        assert!(!match_filter(&filter, &tagged(&[&["tag", "other"]])));
        assert!(!match_filter(&filter, &tagged(&[&["not_tag", "value"]])));
        assert!(!match_filter(&filter, &tagged(&[&["tag"]])));
        assert!(match_filter(
            &filter,
            &tagged(&[&["tag", "other"], &["tag", "value", "wss://relay"]])
        ));
        Ok(())
    }

    #[test]
    fn multiple_tag_filters_are_anded() {
        let filter = Filter::new().tag('e', ["x"]).tag('p', ["y"]);
        assert!(match_filter(&filter, &tagged(&[&["e", "x"], &["p", "y"]])));
        assert!(!match_filter(&filter, &tagged(&[&["e", "x"]])));
    }

    #[test]
    fn since_is_inclusive_until_is_exclusive() {
        let at = |created_at| Event {
            created_at,
            ..event()
        };
        assert!(!match_filter(&Filter::new().since(100), &at(50)));
        assert!(match_filter(&Filter::new().since(100), &at(100)));
        assert!(!match_filter(&Filter::new().until(100), &at(100)));
        assert!(match_filter(&Filter::new().until(100), &at(99)));
    }

    #[test]
    fn limit_is_not_enforced_locally() {
        assert!(match_filter(&Filter::new().limit(0), &event()));
    }

    #[test]
    fn filter_lists_are_ored() {
        let miss = Filter::new().kinds([7]);
        let hit = Filter::new().authors(["abc"]);
        assert!(match_filters(&[miss.clone(), hit], &event()));
        assert!(!match_filters(&[miss], &event()));
        assert!(!match_filters(&[], &event()));
    }

    #[test]
    fn wire_shape() -> Result<(), serde_json::Error> {
        let filter = Filter::new().kinds([1]).limit(10).event_refs(["abc"]);
        let json = serde_json::to_string(&filter)?;
        assert_eq!(json, r##"{"kinds":[1],"limit":10,"#e":["abc"]}"##);

        let parsed: Filter = serde_json::from_str(&json)?;
        assert_eq!(parsed, filter);
        Ok(())
    }

    #[test]
    fn validation_of_tag_keys() {
        assert!(Filter::new().tag('e', ["x"]).validate().is_ok());

        let mut long = Filter::new();
        long.tags.insert("#long".to_string(), vec![]);
        assert!(matches!(long.validate(), Err(ValidationError::InvalidFilter(_))));

        let mut unprefixed = Filter::new();
        unprefixed.tags.insert("e".to_string(), vec![]);
        assert!(matches!(
            unprefixed.validate(),
            Err(ValidationError::InvalidFilter(_))
        ));
    }
}
