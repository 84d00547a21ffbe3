//! Item list reconciliation.
//!
//! Pure state-transition functions over the in-memory item list, so the
//! merge rules stay testable without any transport attached. Two policies
//! exist, one per transport: the push path replaces on snapshots and mutates
//! on deltas; the polling fallback merges whole fetches. A session runs
//! exactly one of them.

use crate::protocol::{FeedAction, FeedDelta, FeedItem};

/// Push policy, snapshot case: the incoming list fully replaces the current
/// one, whatever either contains. Returns whether anything changed.
pub fn apply_snapshot(items: &mut Vec<FeedItem>, incoming: Vec<FeedItem>) -> bool {
    if *items == incoming {
        return false;
    }
    *items = incoming;
    true
}

/// Push policy, delta case. `add` prepends (newest first) unless an item of
/// the same name is already present; `remove` is an idempotent name match;
/// `empty` clears. Returns whether anything changed.
pub fn apply_delta(items: &mut Vec<FeedItem>, delta: FeedDelta) -> bool {
    match delta.action {
        FeedAction::Add => {
            let Some(item) = delta.item else {
                return false;
            };
            if items.iter().any(|existing| existing.name == item.name) {
                return false;
            }
            items.insert(0, item);
            true
        }
        FeedAction::Remove => {
            let Some(item) = delta.item else {
                return false;
            };
            let before = items.len();
            items.retain(|existing| existing.name != item.name);
            items.len() != before
        }
        FeedAction::Empty => {
            if items.is_empty() {
                return false;
            }
            items.clear();
            true
        }
    }
}

/// Polling policy: reconcile a fresh fetch against the current list.
///
/// Entries whose names survive keep their existing instances, names missing
/// from the fetch are dropped, new names are appended, and the result is
/// sorted by date descending. The sort is stable, so items sharing a date
/// keep their kept-then-new relative order. Returns whether the set of names
/// changed.
pub fn merge_snapshot(items: &mut Vec<FeedItem>, incoming: Vec<FeedItem>) -> bool {
    let mut changed = false;
    let mut merged: Vec<FeedItem> = Vec::with_capacity(incoming.len());

    for old in items.drain(..) {
        if incoming.iter().any(|new| new.name == old.name) {
            merged.push(old);
        } else {
            changed = true;
        }
    }

    for new in incoming {
        if !merged.iter().any(|kept| kept.name == new.name) {
            merged.push(new);
            changed = true;
        }
    }

    merged.sort_by(|a, b| b.date.cmp(&a.date));
    *items = merged;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ItemKind;
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn item(name: &str, date: OffsetDateTime) -> FeedItem {
        FeedItem {
            name: name.to_owned(),
            date,
            kind: ItemKind::Text,
        }
    }

    fn add(name: &str) -> FeedDelta {
        FeedDelta {
            action: FeedAction::Add,
            item: Some(item(name, datetime!(2024-03-01 10:00 UTC))),
        }
    }

    fn remove(name: &str) -> FeedDelta {
        FeedDelta {
            action: FeedAction::Remove,
            item: Some(item(name, datetime!(2024-03-01 10:00 UTC))),
        }
    }

    fn names(items: &[FeedItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn add_prepends_newest_first() {
        let mut items = vec![item("y.png", datetime!(2024-02-29 09:30 UTC))];
        assert!(apply_delta(&mut items, add("x.txt")));
        assert_eq!(names(&items), ["x.txt", "y.png"]);
    }

    #[test]
    fn names_stay_unique_across_delta_sequences() {
        let mut items = Vec::new();
        for delta in [add("a"), add("b"), add("a"), remove("b"), add("b"), add("b")] {
            apply_delta(&mut items, delta);
            let mut seen = items.iter().map(|i| &i.name).collect::<Vec<_>>();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), items.len(), "duplicate name in {items:?}");
        }
        assert_eq!(names(&items), ["b", "a"]);
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let mut items = vec![item("a", datetime!(2024-03-01 10:00 UTC))];
        assert!(!apply_delta(&mut items, add("a")));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn remove_of_absent_name_is_a_noop() {
        let mut items = vec![item("a", datetime!(2024-03-01 10:00 UTC))];
        assert!(!apply_delta(&mut items, remove("ghost")));
        assert_eq!(names(&items), ["a"]);
    }

    #[test]
    fn remove_without_item_is_a_noop() {
        let mut items = vec![item("a", datetime!(2024-03-01 10:00 UTC))];
        let delta = FeedDelta {
            action: FeedAction::Remove,
            item: None,
        };
        assert!(!apply_delta(&mut items, delta));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn empty_clears_regardless_of_contents() {
        let mut items = vec![
            item("a", datetime!(2024-03-01 10:00 UTC)),
            item("b", datetime!(2024-03-01 11:00 UTC)),
        ];
        let delta = FeedDelta {
            action: FeedAction::Empty,
            item: None,
        };
        assert!(apply_delta(&mut items, delta));
        assert!(items.is_empty());
        // And again on an already-empty list: nothing to report.
        assert!(!apply_delta(
            &mut items,
            FeedDelta {
                action: FeedAction::Empty,
                item: None
            }
        ));
    }

    #[test]
    fn snapshot_always_replaces() {
        let mut items = vec![item("a", datetime!(2024-03-01 10:00 UTC))];
        assert!(apply_snapshot(
            &mut items,
            vec![item("b", datetime!(2024-03-02 10:00 UTC))]
        ));
        assert_eq!(names(&items), ["b"]);

        // Replacing with an empty list empties the feed.
        assert!(apply_snapshot(&mut items, Vec::new()));
        assert!(items.is_empty());
    }

    #[test]
    fn identical_snapshot_reports_no_change() {
        let mut items = vec![item("a", datetime!(2024-03-01 10:00 UTC))];
        let same = items.clone();
        assert!(!apply_snapshot(&mut items, same));
    }

    #[test]
    fn merge_keeps_drops_and_appends_by_name() {
        let mut items = vec![
            item("kept", datetime!(2024-03-01 12:00 UTC)),
            item("vanished", datetime!(2024-03-01 11:00 UTC)),
        ];
        let changed = merge_snapshot(
            &mut items,
            vec![
                item("kept", datetime!(2024-03-01 12:00 UTC)),
                item("fresh", datetime!(2024-03-01 13:00 UTC)),
            ],
        );
        assert!(changed);
        assert_eq!(names(&items), ["fresh", "kept"]);
    }

    #[test]
    fn merge_sorts_by_date_descending() {
        let mut items = Vec::new();
        merge_snapshot(
            &mut items,
            vec![
                item("old", datetime!(2024-02-01 10:00 UTC)),
                item("new", datetime!(2024-03-01 10:00 UTC)),
                item("mid", datetime!(2024-02-15 10:00 UTC)),
            ],
        );
        assert_eq!(names(&items), ["new", "mid", "old"]);
    }

    #[test]
    fn merge_with_same_names_reports_no_change() {
        let mut items = vec![
            item("a", datetime!(2024-03-01 10:00 UTC)),
            item("b", datetime!(2024-02-01 10:00 UTC)),
        ];
        let changed = merge_snapshot(
            &mut items,
            vec![
                item("b", datetime!(2024-02-01 10:00 UTC)),
                item("a", datetime!(2024-03-01 10:00 UTC)),
            ],
        );
        assert!(!changed);
        assert_eq!(names(&items), ["a", "b"]);
    }

    #[test]
    fn merge_keeps_relative_order_on_equal_dates() {
        let date = datetime!(2024-03-01 10:00 UTC);
        let mut items = vec![item("first", date)];
        merge_snapshot(&mut items, vec![item("first", date), item("second", date)]);
        // Stable sort: the kept item stays ahead of the appended one.
        assert_eq!(names(&items), ["first", "second"]);
    }
}
