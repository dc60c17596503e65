//! Property-based tests for playlist navigation
//!
//! Navigation is driven the way the coordinator drives it: `advance` or
//! `retreat`, then `set_current` on the landing index.

use cadenza_playback::{NavigationState, RepeatMode};
use proptest::prelude::*;
use std::collections::HashSet;

fn step_next(nav: &mut NavigationState, len: usize) -> Option<usize> {
    let index = nav.advance(len)?;
    nav.set_current(Some(index), len);
    Some(index)
}

fn list_and_start() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|len| (Just(len), 0..len))
}

proptest! {
    /// Property: N nexts under repeat-all come back to the start
    #[test]
    fn repeat_all_is_cyclic((len, start) in list_and_start()) {
        let mut nav = NavigationState::with_seed(1);
        nav.set_repeat(RepeatMode::All, len);
        nav.set_current(Some(start), len);

        for _ in 0..len {
            prop_assert!(step_next(&mut nav, len).is_some());
        }
        prop_assert_eq!(nav.current(), Some(start));
    }

    /// Property: repeat-one never moves, in either direction
    #[test]
    fn repeat_one_is_fixed(
        (len, start) in list_and_start(),
        shuffling in any::<bool>(),
        moves in prop::collection::vec(any::<bool>(), 1..20),
    ) {
        let mut nav = NavigationState::with_seed(2);
        if shuffling {
            nav.toggle_shuffle(len);
        }
        nav.set_repeat(RepeatMode::One, len);
        nav.set_current(Some(start), len);

        for forward in moves {
            let landed = if forward {
                nav.advance(len)
            } else {
                nav.retreat(len)
            };
            prop_assert_eq!(landed, Some(start));
            nav.set_current(landed, len);
        }
    }

    /// Property: a shuffle run never repeats until every item was played,
    /// and without repeat it then runs out
    #[test]
    fn shuffle_visits_each_item_once(len in 3usize..30, seed in any::<u64>(), start_offset in 0usize..30) {
        let start = start_offset % len;
        let mut nav = NavigationState::with_seed(seed);
        nav.toggle_shuffle(len);
        nav.set_current(Some(start), len);

        let mut seen = HashSet::from([start]);
        for _ in 1..len {
            let index = step_next(&mut nav, len);
            prop_assert!(index.is_some());
            prop_assert!(seen.insert(index.unwrap()), "repeated index before exhaustion");
        }

        prop_assert_eq!(seen.len(), len);
        prop_assert_eq!(nav.next(), None);
        prop_assert_eq!(nav.advance(len), None);
    }

    /// Property: neighbours always point inside the list
    #[test]
    fn neighbours_stay_in_bounds(
        (len, start) in list_and_start(),
        repeat in prop_oneof![Just(RepeatMode::None), Just(RepeatMode::All), Just(RepeatMode::One)],
        shuffling in any::<bool>(),
        steps in 0usize..60,
    ) {
        let mut nav = NavigationState::with_seed(3);
        nav.set_repeat(repeat, len);
        if shuffling {
            nav.toggle_shuffle(len);
        }
        nav.set_current(Some(start), len);

        for _ in 0..steps {
            prop_assert!(nav.next().map_or(true, |i| i < len));
            prop_assert!(nav.previous().map_or(true, |i| i < len));
            if step_next(&mut nav, len).is_none() {
                break;
            }
        }
    }

    /// Property: shuffle stays off for lists of two or fewer
    #[test]
    fn tiny_lists_never_shuffle(len in 0usize..3) {
        let mut nav = NavigationState::with_seed(4);
        nav.toggle_shuffle(len);
        prop_assert!(!nav.is_shuffling());
    }
}
