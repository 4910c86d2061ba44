pub(crate) fn tag_name(tag: &[String]) -> Option<&str> {
    tag.first().map(String::as_str)
}

/// Field `index` of a tag, treating an empty string as absent.
pub(crate) fn tag_field(tag: &[String], index: usize) -> Option<&str> {
    tag.get(index)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

pub(crate) fn is_tag(tag: &[String], name: &str) -> bool {
    matches!(tag_name(tag), Some(tag_name) if tag_name == name)
}

/// Tags named `name` that carry a non-empty value.
pub(crate) fn tags_named<'a>(
    tags: &'a [Vec<String>],
    name: &'a str,
) -> impl Iterator<Item = &'a [String]> + 'a {
    tags.iter()
        .filter(move |tag| is_tag(tag, name) && tag_field(tag, 1).is_some())
        .map(Vec::as_slice)
}

/// Relay hint at position 2, as the one-element list pointers carry.
pub(crate) fn relay_hint(tag: &[String]) -> Vec<String> {
    tag_field(tag, 2).map(str::to_owned).into_iter().collect()
}
