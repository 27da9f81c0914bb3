//! Sample-point planning.
//!
//! [`SamplePlan`] turns a video duration and a requested snapshot count (or
//! rate per minute) into the ordered millisecond offsets at which frames are
//! taken. Samples are spaced so the first one is not at the very start and
//! the last one is not at the very end, and never closer than one second
//! apart.
//!
//! # Example
//!
//! ```
//! use framesnap::SamplePlan;
//!
//! let plan = SamplePlan::new(130_000, 3, 0);
//! assert_eq!(plan.delta_ms(), 32_500);
//! assert_eq!(plan.points(), &[32_500, 65_000, 97_500]);
//! ```

/// Minimum spacing between two sample points, in milliseconds.
pub const MIN_DELTA_MS: u64 = 1000;

const MS_PER_MINUTE: u64 = 60_000;

/// Ordered, strictly increasing millisecond offsets into a video.
///
/// Every point is positive and strictly less than the duration the plan was
/// computed for. A plan is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct SamplePlan {
    duration_ms: u64,
    count: u64,
    delta_ms: u64,
    points: Vec<u64>,
}

impl SamplePlan {
    /// Compute the plan for a video of `duration_ms`.
    ///
    /// When `count_per_minute` is non-zero it replaces `count` with
    /// `count_per_minute * duration_ms / 60000`. The count is clamped to at
    /// least 1 and the spacing to at least [`MIN_DELTA_MS`], so a large
    /// count on a short video yields fewer points than requested.
    pub fn new(duration_ms: u64, count: u32, count_per_minute: u32) -> Self {
        let count = if count_per_minute > 0 {
            u64::from(count_per_minute).saturating_mul(duration_ms) / MS_PER_MINUTE
        } else {
            u64::from(count)
        }
        .max(1);

        let delta_ms = (duration_ms / count.saturating_add(1)).max(MIN_DELTA_MS);

        let points = (1..=count)
            .map_while(|index| index.checked_mul(delta_ms))
            .take_while(|&time_ms| time_ms < duration_ms)
            .collect();

        Self {
            duration_ms,
            count,
            delta_ms,
            points,
        }
    }

    /// Duration the plan was computed for.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Effective snapshot count after rate override and clamping.
    ///
    /// This is an upper bound on [`len`](SamplePlan::len).
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Spacing between consecutive sample points.
    pub fn delta_ms(&self) -> u64 {
        self.delta_ms
    }

    /// The sample points in order.
    pub fn points(&self) -> &[u64] {
        &self.points
    }

    /// Number of sample points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` when the video is too short for any sample point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate `(index, time_ms)` pairs with 1-based indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.points
            .iter()
            .enumerate()
            .map(|(offset, &time_ms)| (offset + 1, time_ms))
    }
}

/// Shorthand for [`SamplePlan::new`].
pub fn plan(duration_ms: u64, count: u32, count_per_minute: u32) -> SamplePlan {
    SamplePlan::new(duration_ms, count, count_per_minute)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(plan: &SamplePlan, requested: u64) {
        let points = plan.points();
        assert!(points.windows(2).all(|pair| pair[0] < pair[1]), "{points:?}");
        assert!(points.iter().all(|&p| p > 0 && p < plan.duration_ms()));
        assert!(points.len() as u64 <= requested);
        assert!(plan.delta_ms() >= MIN_DELTA_MS);
    }

    #[test]
    fn evenly_spaced_inside_duration() {
        let plan = plan(130_000, 3, 0);
        assert_eq!(plan.delta_ms(), 32_500);
        assert_eq!(plan.points(), &[32_500, 65_000, 97_500]);
    }

    #[test]
    fn single_snapshot_lands_in_the_middle() {
        let plan = plan(10_000, 1, 0);
        assert_eq!(plan.points(), &[5_000]);
    }

    #[test]
    fn zero_count_is_clamped_to_one() {
        let plan = plan(10_000, 0, 0);
        assert_eq!(plan.count(), 1);
        assert_eq!(plan.points(), &[5_000]);
    }

    #[test]
    fn dense_requests_are_limited_to_one_per_second() {
        let plan = plan(5_500, 100, 0);
        assert_eq!(plan.delta_ms(), MIN_DELTA_MS);
        assert_eq!(plan.points(), &[1_000, 2_000, 3_000, 4_000, 5_000]);
    }

    #[test]
    fn rate_per_minute_overrides_count() {
        // 3 minutes at 2 per minute -> 6 snapshots, count ignored.
        let plan = plan(180_000, 50, 2);
        assert_eq!(plan.count(), 6);
        assert_eq!(plan.delta_ms(), 180_000 / 7);
        assert_eq!(plan.len(), 6);
    }

    #[test]
    fn low_rate_on_short_video_clamps_to_one() {
        // 1 per minute on 20 s -> floor(0.33) = 0 -> 1.
        let plan = plan(20_000, 9, 1);
        assert_eq!(plan.count(), 1);
        assert_eq!(plan.points(), &[10_000]);
    }

    #[test]
    fn videos_shorter_than_a_second_have_no_points() {
        assert!(plan(800, 3, 0).is_empty());
        assert!(plan(1_000, 1, 0).is_empty());
        assert!(plan(0, 1, 0).is_empty());
    }

    #[test]
    fn high_rate_on_long_video_is_capped_by_min_delta() {
        // 10 hours at 1000 per minute asks for 600k points.
        let plan = plan(36_000_000, 1, 1_000);
        assert_eq!(plan.count(), 600_000);
        assert_eq!(plan.delta_ms(), MIN_DELTA_MS);
        assert_eq!(plan.len(), 35_999);
        assert_well_formed(&plan, plan.count());
    }

    #[test]
    fn extreme_durations_do_not_overflow() {
        let single = SamplePlan::new(u64::MAX, 1, 0);
        assert_eq!(single.points(), &[u64::MAX / 2]);
    }

    #[test]
    fn iter_yields_one_based_indices() {
        let plan = plan(130_000, 3, 0);
        let pairs: Vec<_> = plan.iter().collect();
        assert_eq!(pairs, vec![(1, 32_500), (2, 65_000), (3, 97_500)]);
    }

    #[test]
    fn well_formed_across_a_grid() {
        for duration in [1, 999, 1_001, 2_500, 59_999, 60_000, 3_600_000, 7_777_777] {
            for count in [1, 2, 3, 7, 60, 1_000] {
                let plan = plan(duration, count, 0);
                assert_well_formed(&plan, u64::from(count));
            }
        }
    }
}
