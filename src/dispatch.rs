//! Work partitioning for the data-parallel update passes.
//!
//! Every per-frame pass is a batch of logically independent workers: one per
//! agent, one per trail cell. The scheduler translates those iteration
//! counts into group counts sized to a preferred group size, mirroring how a
//! compute dispatch sizes its thread groups. Group counts use ceiling
//! division; truncating would silently drop the tail of a dimension.

use std::ops::Range;

/// Preferred number of iterations handled by one parallel group, per
/// dimension. Unused dimensions stay at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GroupSize {
    pub const fn linear(x: u32) -> Self {
        Self { x, y: 1, z: 1 }
    }

    pub const fn planar(x: u32, y: u32) -> Self {
        Self { x, y, z: 1 }
    }
}

impl Default for GroupSize {
    fn default() -> Self {
        // 64 agents per group, 8 grid rows per band.
        Self { x: 64, y: 8, z: 1 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupCount {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GroupCount {
    pub fn total(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

/// `ceil(iterations / group_size)`: the number of groups that covers every
/// iteration, including a short group at the tail.
pub fn groups_needed(iterations: u32, group_size: u32) -> u32 {
    debug_assert!(group_size > 0, "group size must be at least 1");
    ((iterations as u64 + group_size as u64 - 1) / group_size as u64) as u32
}

pub struct DispatchScheduler {
    group_size: GroupSize,
}

impl Default for DispatchScheduler {
    fn default() -> Self {
        Self::new(GroupSize::default())
    }
}

impl DispatchScheduler {
    pub fn new(group_size: GroupSize) -> Self {
        Self { group_size }
    }

    pub fn group_size(&self) -> GroupSize {
        self.group_size
    }

    /// Group counts for a three-dimensional iteration extent. Callers with
    /// fewer dimensions pass 1 for the rest.
    pub fn group_count(&self, x: u32, y: u32, z: u32) -> GroupCount {
        GroupCount {
            x: groups_needed(x, self.group_size.x),
            y: groups_needed(y, self.group_size.y),
            z: groups_needed(z, self.group_size.z),
        }
    }

    /// Index ranges covering `0..iterations` along X, one per group. The
    /// union of the ranges is exactly the full iteration space.
    pub fn linear_groups(&self, iterations: usize) -> Vec<Range<usize>> {
        Self::ranges(iterations, self.group_size.x as usize)
    }

    /// Row bands covering `0..rows` along Y, one per group.
    pub fn row_groups(&self, rows: usize) -> Vec<Range<usize>> {
        Self::ranges(rows, self.group_size.y as usize)
    }

    fn ranges(iterations: usize, group_size: usize) -> Vec<Range<usize>> {
        let group_size = group_size.max(1);
        (0..iterations)
            .step_by(group_size)
            .map(|start| start..(start + group_size).min(iterations))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn groups_needed_rounds_up_on_remainder() {
        assert_eq!(groups_needed(100, 64), 2);
        assert_eq!(groups_needed(65, 64), 2);
        assert_eq!(groups_needed(1000, 3), 334);
    }

    #[test]
    fn groups_needed_is_exact_when_evenly_divisible() {
        assert_eq!(groups_needed(128, 64), 2);
        assert_eq!(groups_needed(64, 64), 1);
        assert_eq!(groups_needed(0, 64), 0);
    }

    #[test]
    fn fewer_iterations_than_group_size_still_dispatches_one_group() {
        assert_eq!(groups_needed(1, 64), 1);
        assert_eq!(groups_needed(63, 64), 1);
    }

    #[test]
    fn unused_dimensions_default_to_one_group() {
        let scheduler = DispatchScheduler::new(GroupSize::linear(16));
        let count = scheduler.group_count(100, 1, 1);

        assert_eq!(count, GroupCount { x: 7, y: 1, z: 1 });
        assert_eq!(count.total(), 7);
    }

    #[test]
    fn linear_groups_cover_the_whole_iteration_space() {
        let scheduler = DispatchScheduler::new(GroupSize::linear(64));
        let groups = scheduler.linear_groups(200);

        assert_eq!(groups.len(), groups_needed(200, 64) as usize);
        assert_eq!(groups.first().unwrap().clone(), 0..64);
        assert_eq!(groups.last().unwrap().clone(), 192..200);

        let covered: usize = groups.iter().map(|range| range.len()).sum();
        assert_eq!(covered, 200);
    }

    #[test]
    fn row_groups_cover_every_row_once() {
        let scheduler = DispatchScheduler::new(GroupSize::planar(64, 8));
        let bands = scheduler.row_groups(30);

        assert_eq!(bands.len(), 4);
        let mut seen = vec![false; 30];
        for band in bands {
            for row in band {
                assert!(!seen[row], "row {} dispatched twice", row);
                seen[row] = true;
            }
        }
        assert!(seen.into_iter().all(|row| row));
    }
}
