// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use tome_core::{generate_new_id, ChangeMode, NoteId};

fn id_set() -> impl Strategy<Value = BTreeSet<NoteId>> {
    prop::collection::btree_set((1u32..64).prop_map(NoteId), 0..24)
}

proptest! {
    #[test]
    fn recycling_picks_the_smallest_free_id(existing in id_set()) {
        let id = generate_new_id(&existing, true).unwrap();
        prop_assert!(id.is_positive());
        prop_assert!(!existing.contains(&id));
        for smaller in 1..id.get() {
            prop_assert!(existing.contains(&NoteId(smaller)));
        }
    }

    #[test]
    fn without_recycling_the_id_follows_the_maximum(existing in id_set()) {
        let id = generate_new_id(&existing, false).unwrap();
        let max = existing.iter().next_back().map_or(0, |m| m.get());
        prop_assert_eq!(id, NoteId(max + 1));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn swapping_twice_restores_every_note(count in 2u32..7, a in 1u32..7, b in 1u32..7) {
        prop_assume!(a <= count && b <= count);
        let (_tmp, session) = common::session();
        let mut table = common::table_with_notes(&session, "films", count, false);
        let before = common::names(&table);
        table.change_id(NoteId(a), NoteId(b), ChangeMode::Swap).unwrap();
        table.change_id(NoteId(a), NoteId(b), ChangeMode::Swap).unwrap();
        prop_assert_eq!(common::names(&table), before);
    }

    #[test]
    fn insert_keeps_the_multiset_of_notes(count in 2u32..7, source in 1u32..7, target in 1u32..7) {
        prop_assume!(source <= count && target <= count);
        let (_tmp, session) = common::session();
        let mut table = common::table_with_notes(&session, "films", count, false);
        let mut before: Vec<_> = common::names(&table).into_values().collect();
        table.change_id(NoteId(source), NoteId(target), ChangeMode::Insert).unwrap();
        let mut after: Vec<_> = common::names(&table).into_values().collect();
        before.sort();
        after.sort();
        prop_assert_eq!(after, before);
        prop_assert_eq!(table.len(), count as usize);
        prop_assert!(!table.contains(NoteId::TRANSIENT));
        if source != target {
            let moved = format!("note-{source}");
            prop_assert_eq!(table.note(NoteId(target)).unwrap().name(), Some(moved.as_str()));
        }
    }
}
