// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution of a column's crossing events into support spans.
//!
//! After sorting, a column reads bottom to top as alternating runs of floors
//! (tops) and ceilings (bottoms). A gap that needs a pillar is a run of tops
//! followed by a run of bottoms: the pillar stands on the highest top of the
//! first run and reaches up to the last bottom of the second.

use serde::Serialize;
use smallvec::SmallVec;

use crate::config::SupportType;
use crate::planes::{CellEvents, PlaneEvent};

/// Spans shorter than this are dropped.
pub const MIN_COLUMN_HEIGHT: f64 = 0.01;

/// Crossings of the same kind closer than this are one surface.
pub const EVENT_MERGE_EPSILON: f64 = 0.001;

/// A vertical span of one grid cell that needs a pillar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupportInterval {
    pub x: usize,
    pub y: usize,
    pub bottom_z: f64,
    pub top_z: f64,
}

impl SupportInterval {
    #[inline]
    pub fn height(&self) -> f64 {
        self.top_z - self.bottom_z
    }
}

/// Puts a column's events in resolution order.
///
/// The first event is the bed and keeps its place. The rest are sorted by
/// height; a top and a bottom within [`EVENT_MERGE_EPSILON`] of each other
/// are ordered top first, so a floor touching a ceiling reads as closed.
/// Runs of same-kind events within the epsilon collapse to their first
/// member.
pub fn sort_events(events: &mut Vec<PlaneEvent>) {
    if events.len() < 2 {
        return;
    }

    events[1..].sort_by(|a, b| {
        a.z.total_cmp(&b.z)
            .then_with(|| a.is_bottom.cmp(&b.is_bottom))
    });

    // Near-equal bottom/top pairs: move the top down past the bottom
    let mut settled = false;
    while !settled {
        settled = true;
        for k in 1..events.len() - 1 {
            let (a, b) = (events[k], events[k + 1]);
            if a.is_bottom && !b.is_bottom && b.z - a.z <= EVENT_MERGE_EPSILON {
                events.swap(k, k + 1);
                settled = false;
            }
        }
    }

    events.dedup_by(|later, kept| {
        later.is_bottom == kept.is_bottom && (later.z - kept.z).abs() <= EVENT_MERGE_EPSILON
    });
}

/// Index of the next top at or after `i`.
///
/// Steps off a bottom at `i`, then skips any further bottoms. Returns
/// `events.len()` when no top follows.
pub fn next_top(events: &[PlaneEvent], mut i: usize) -> usize {
    if i < events.len() && events[i].is_bottom {
        i += 1;
    }
    while i < events.len() && events[i].is_bottom {
        i += 1;
    }
    i
}

/// Index of the last bottom of the next ceiling run above an open gap.
///
/// Starting on a top that is immediately met by a bottom at or below it
/// (the two surfaces touch, so there is no gap), that bottom run is
/// skipped first. Then the run of tops is crossed, and the following run
/// of bottoms is walked to its last member. `None` when the list ends
/// before a bottom is found.
pub fn next_bottom(events: &[PlaneEvent], mut i: usize) -> Option<usize> {
    let n = events.len();

    if i + 1 < n
        && !events[i].is_bottom
        && events[i + 1].is_bottom
        && events[i + 1].z <= events[i].z
    {
        i += 1;
        while i < n && events[i].is_bottom {
            i += 1;
        }
    }

    while i < n && !events[i].is_bottom {
        i += 1;
    }
    if i >= n {
        return None;
    }
    while i + 1 < n && events[i + 1].is_bottom {
        i += 1;
    }
    Some(i)
}

/// Height of the floor a pillar under the bottom run ending at `last`
/// stands on: the top just before that run, or the bed.
fn floor_below(events: &[PlaneEvent], last: usize) -> f64 {
    let mut start = last;
    while start > 0 && events[start - 1].is_bottom {
        start -= 1;
    }
    start.checked_sub(1).map_or(0.0, |top| events[top].z)
}

/// Spans `(bottom_z, top_z)` of one column needing a pillar.
///
/// Under [`SupportType::Normal`] a pillar stands on the highest floor below
/// its ceiling, not on the first floor after the previous ceiling: floors
/// at 5 and 5.5 under a ceiling at 7 give `(5.5, 7)`.
///
/// `events` must start with the bed; order of the rest does not matter.
/// The result is the same for any permutation of the input and for input
/// that was already sorted.
pub fn resolve_cell(
    events: &[PlaneEvent],
    support_type: SupportType,
    minimum_support_height: f64,
) -> SmallVec<[(f64, f64); 4]> {
    let mut spans = SmallVec::new();
    let mut events = events.to_vec();
    sort_events(&mut events);
    if events.len() < 2 {
        return spans;
    }

    // The part sits on (or almost on) the bed in this column
    let resting = events[1].is_bottom && events[1].z <= minimum_support_height;

    match support_type {
        SupportType::FromBed => {
            // Only a ceiling directly over the bed can get a pillar from it
            if !resting && events[1].is_bottom {
                if let Some(b) = next_bottom(&events, 0) {
                    spans.push((0.0, events[b].z));
                }
            }
        }
        SupportType::Normal => {
            let mut i = if resting { next_top(&events, 1) } else { 0 };
            while i < events.len() {
                let Some(b) = next_bottom(&events, i) else {
                    break;
                };
                spans.push((floor_below(&events, b), events[b].z));
                let next = next_top(&events, b);
                if next <= i {
                    break;
                }
                i = next;
            }
        }
    }

    spans.retain(|(bottom, top)| *top - *bottom >= MIN_COLUMN_HEIGHT);
    spans
}

/// Resolve every traced cell.
pub fn resolve_grid(
    cells: &[CellEvents],
    support_type: SupportType,
    minimum_support_height: f64,
) -> Vec<SupportInterval> {
    cells
        .iter()
        .flat_map(|cell| {
            resolve_cell(&cell.events, support_type, minimum_support_height)
                .into_iter()
                .map(move |(bottom_z, top_z)| SupportInterval {
                    x: cell.x,
                    y: cell.y,
                    bottom_z,
                    top_z,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: bool = false;
    const B: bool = true;

    fn events(list: &[(f64, bool)]) -> Vec<PlaneEvent> {
        std::iter::once(PlaneEvent::BED)
            .chain(list.iter().map(|&(z, is_bottom)| PlaneEvent { z, is_bottom }))
            .collect()
    }

    fn normal(list: &[(f64, bool)]) -> Vec<(f64, f64)> {
        resolve_cell(&events(list), SupportType::Normal, 0.05).to_vec()
    }

    fn from_bed(list: &[(f64, bool)]) -> Vec<(f64, f64)> {
        resolve_cell(&events(list), SupportType::FromBed, 0.05).to_vec()
    }

    #[test]
    fn sort_keeps_bed_first_and_orders_ties_top_first() {
        let mut list = events(&[(6.0, B), (3.0, T), (3.0, B), (-0.0005, B)]);
        sort_events(&mut list);
        assert_eq!(list[0], PlaneEvent::BED);
        assert_eq!(
            list[1..],
            [
                PlaneEvent::bottom(-0.0005),
                PlaneEvent::top(3.0),
                PlaneEvent::bottom(3.0),
                PlaneEvent::bottom(6.0),
            ]
        );
    }

    #[test]
    fn near_equal_bottom_and_top_read_as_touching() {
        let mut list = events(&[(3.0, T), (2.9999999, B), (6.0, B)]);
        sort_events(&mut list);
        assert!(!list[1].is_bottom);
        assert!(list[2].is_bottom);
    }

    #[test]
    fn duplicate_sub_ray_hits_collapse() {
        let mut list = events(&[
            (5.0, B),
            (5.0000004, B),
            (5.0, B),
            (8.0, T),
            (8.0002, T),
        ]);
        sort_events(&mut list);
        assert_eq!(list.len(), 3);
        assert_eq!(list[1], PlaneEvent::bottom(5.0));
        assert_eq!(list[2], PlaneEvent::top(8.0));
    }

    #[test]
    fn scanners_on_a_plain_gap() {
        // bed, floor 3, ceiling 6, floor 9
        let mut list = events(&[(3.0, T), (6.0, B), (9.0, T)]);
        sort_events(&mut list);
        assert_eq!(next_bottom(&list, 0), Some(2));
        assert_eq!(next_top(&list, 2), 3);
        assert_eq!(next_bottom(&list, 3), None);
        assert_eq!(next_top(&list, 3), 3);
    }

    #[test]
    fn next_bottom_walks_to_last_of_run() {
        let list = events(&[(5.0, B), (5.5, B), (7.0, T)]);
        assert_eq!(next_bottom(&list, 0), Some(2));
    }

    #[test]
    fn next_bottom_skips_touching_surfaces() {
        // floor at 3 touched by a ceiling at 3, real gap from 4 to 8
        let list = events(&[(3.0, T), (3.0, B), (4.0, T), (8.0, B)]);
        assert_eq!(next_bottom(&list, 1), Some(4));
    }

    #[test]
    fn empty_column_has_no_spans() {
        assert!(normal(&[]).is_empty());
        assert!(from_bed(&[]).is_empty());
    }

    #[test]
    fn part_on_bed_needs_nothing() {
        // top face only; the bottom face lies on the bed
        assert!(normal(&[(2.0, T)]).is_empty());
        // bottom face slightly lifted, still within the resting tolerance
        assert!(normal(&[(0.02, B), (2.0, T)]).is_empty());
        assert!(from_bed(&[(0.02, B), (2.0, T)]).is_empty());
    }

    #[test]
    fn suspended_box() {
        let list = [(5.0, B), (8.0, T)];
        assert_eq!(normal(&list), vec![(0.0, 5.0)]);
        assert_eq!(from_bed(&list), vec![(0.0, 5.0)]);
    }

    #[test]
    fn stacked_boxes() {
        // lower box 0..3 on the bed, upper box 6..9
        let list = [(3.0, T), (6.0, B), (9.0, T)];
        assert_eq!(normal(&list), vec![(3.0, 6.0)]);
        // the lower box blocks the way to the bed
        assert!(from_bed(&list).is_empty());
    }

    #[test]
    fn several_gaps_in_one_column() {
        // ceiling 4 over the bed, floor 5, ceiling 7, floor 8, ceiling 12
        let list = [(4.0, B), (5.0, T), (7.0, B), (8.0, T), (12.0, B), (13.0, T)];
        assert_eq!(normal(&list), vec![(0.0, 4.0), (5.0, 7.0), (8.0, 12.0)]);
        assert_eq!(from_bed(&list), vec![(0.0, 4.0)]);
    }

    #[test]
    fn pillar_stands_on_highest_floor() {
        let list = [(2.0, T), (2.5, T), (6.0, B)];
        assert_eq!(normal(&list), vec![(2.5, 6.0)]);
    }

    #[test]
    fn resting_part_with_overhang_above() {
        // part resting at 0.02 up to 3, separate ceiling at 6
        let list = [(0.02, B), (3.0, T), (6.0, B), (7.0, T)];
        assert_eq!(normal(&list), vec![(3.0, 6.0)]);
        assert!(from_bed(&list).is_empty());
    }

    #[test]
    fn touching_parts_leave_no_sliver() {
        // stem 0..4 with a slab 4..6 sitting on it
        assert!(normal(&[(4.0, T), (4.0, B), (6.0, T)]).is_empty());
        assert!(normal(&[(4.0, T), (3.9999999, B), (6.0, T)]).is_empty());
    }

    #[test]
    fn spans_are_never_shorter_than_minimum() {
        let list = [(0.5, T), (0.505, B), (1.0, T), (2.0, B)];
        for (bottom, top) in normal(&list) {
            assert!(top - bottom >= MIN_COLUMN_HEIGHT);
        }
        assert_eq!(normal(&list), vec![(1.0, 2.0)]);
    }

    #[test]
    fn resolution_is_order_independent_and_repeatable() {
        let shuffled = events(&[(9.0, T), (6.0, B), (3.0, T), (6.0, B), (12.0, B), (13.0, T)]);
        let first = resolve_cell(&shuffled, SupportType::Normal, 0.05);

        let mut sorted = shuffled.clone();
        sort_events(&mut sorted);
        let second = resolve_cell(&sorted, SupportType::Normal, 0.05);
        let third = resolve_cell(&sorted, SupportType::Normal, 0.05);

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(first.to_vec(), vec![(3.0, 6.0), (9.0, 12.0)]);
    }

    #[test]
    fn grid_resolution_tags_cells() {
        let cells = vec![
            CellEvents {
                x: 0,
                y: 1,
                events: events(&[(5.0, B), (8.0, T)]),
            },
            CellEvents {
                x: 1,
                y: 1,
                events: events(&[]),
            },
        ];
        let intervals = resolve_grid(&cells, SupportType::Normal, 0.05);
        assert_eq!(
            intervals,
            vec![SupportInterval {
                x: 0,
                y: 1,
                bottom_z: 0.0,
                top_z: 5.0
            }]
        );
        assert_eq!(intervals[0].height(), 5.0);
    }

    #[test]
    fn highest_floor_wins_after_earlier_ceiling() {
        let spans = normal(&[(4.0, B), (5.0, T), (5.5, T), (7.0, B)]);
        assert_eq!(spans, vec![(0.0, 4.0), (5.5, 7.0)]);
    }
}
