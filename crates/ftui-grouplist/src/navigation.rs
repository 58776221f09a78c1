#![forbid(unsafe_code)]

//! Navigation targets for rows.
//!
//! Paths are pure functions of identity. Each segment is percent-encoded so
//! names containing `/`, `@`, spaces, or non-ASCII text stay one segment.

use urlencoding::encode;

use crate::model::GroupAddress;

/// Path of a group's overview page: `/locations/{name@location}`.
#[must_use]
pub fn group_path(group: &GroupAddress) -> String {
    format!("/locations/{}", encode(&group.key()))
}

/// Path of an item's page: `/locations/{name@location}/items/{item}`.
#[must_use]
pub fn item_path(group: &GroupAddress, item_name: &str) -> String {
    format!("{}/items/{}", group_path(group), encode(item_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        let group = GroupAddress::new("etl", "prod");
        assert_eq!(group_path(&group), "/locations/etl%40prod");
        assert_eq!(item_path(&group, "daily"), "/locations/etl%40prod/items/daily");
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let group = GroupAddress::new("my repo", "host/1");
        assert_eq!(
            item_path(&group, "a/b c"),
            "/locations/my%20repo%40host%2F1/items/a%2Fb%20c"
        );
    }

    #[test]
    fn paths_decode_back_to_identity() {
        let group = GroupAddress::new("ünï", "lôc");
        let path = item_path(&group, "jöb");
        let segments: Vec<&str> = path.split('/').collect();
        assert_eq!(segments.len(), 5);
        assert_eq!(
            urlencoding::decode(segments[2]).expect("utf-8"),
            group.key()
        );
        assert_eq!(urlencoding::decode(segments[4]).expect("utf-8"), "jöb");
    }

    #[test]
    fn separator_in_names_yields_distinct_paths() {
        let x = GroupAddress::new("a@b", "c");
        let y = GroupAddress::new("a", "b@c");
        assert_ne!(group_path(&x), group_path(&y));
        assert_ne!(item_path(&x, "job"), item_path(&y, "job"));
    }
}
