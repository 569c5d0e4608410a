//! Merging element versions received from other peers.

use scribble_core::{Element, ElementsMap};

/// Whether a remote copy of an element should replace the local one.
///
/// Higher `version` wins; on a tie the lower `version_nonce` wins so every
/// peer settles on the same copy.
pub fn remote_wins(local: &Element, remote: &Element) -> bool {
    remote.version > local.version
        || (remote.version == local.version && remote.version_nonce < local.version_nonce)
}

/// Merge `remote` into a copy of `local`.
///
/// Returns the merged collection, re-sorted by fractional index if anything
/// was accepted, and the number of accepted elements.
pub fn reconcile_remote(local: &ElementsMap, remote: impl IntoIterator<Item = Element>) -> (ElementsMap, usize) {
    let mut merged = local.clone();
    let mut accepted = 0;

    for element in remote {
        let accept = merged
            .get(&element.id)
            .is_none_or(|current| remote_wins(current, &element));
        if accept {
            merged.insert(element);
            accepted += 1;
        } else {
            tracing::trace!(id = %element.id, version = element.version, "keeping local copy");
        }
    }

    if accepted > 0 {
        merged.sort_by_fractional_index();
    }
    (merged, accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribble_core::ElementId;

    #[test]
    fn higher_version_wins() {
        let local = Element::rectangle().with_id("a");
        let remote = local.updated_with(|e| e.x = 5.0);

        let (merged, accepted) = reconcile_remote(&[local.clone()].into_iter().collect(), [remote]);

        assert_eq!(accepted, 1);
        assert_eq!(merged.get(&ElementId::from("a")).unwrap().x, 5.0);

        let (merged, accepted) = reconcile_remote(&merged, [local]);
        assert_eq!(accepted, 0);
        assert_eq!(merged.get(&ElementId::from("a")).unwrap().x, 5.0);
    }

    #[test]
    fn version_tie_goes_to_lower_nonce() {
        let mut local = Element::rectangle().with_id("a");
        local.version_nonce = 10;
        let mut remote = local.clone();
        remote.version_nonce = 3;
        remote.x = 7.0;

        assert!(remote_wins(&local, &remote));
        assert!(!remote_wins(&remote, &local));
        assert!(!remote_wins(&local, &local));
    }

    #[test]
    fn unknown_elements_are_inserted_in_index_order() {
        let local: ElementsMap = [Element::rectangle().with_id("top").with_index("a5")].into_iter().collect();
        let remote = Element::rectangle().with_id("bottom").with_index("a1");

        let (merged, accepted) = reconcile_remote(&local, [remote]);

        assert_eq!(accepted, 1);
        assert_eq!(
            merged.ids().map(ElementId::as_str).collect::<Vec<_>>(),
            vec!["bottom", "top"]
        );
    }
}
