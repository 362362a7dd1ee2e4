//! Build parameters for [`Bvh::build`].
//!
//! [`Bvh::build`]: crate::bvh::Bvh::build

use crate::error::{BvhError, Result};

/// Hard cap on [`BuildConfig::depth_limit`]. Also bounds the recursion depth of the
/// builder and therefore its stack usage.
pub const MAX_DEPTH_LIMIT: u32 = 32;

/// Decides when a chunk stops being split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopRule {
    /// Become a leaf when the best split does not lower the cost of the chunk.
    CostImprovement,

    /// Keep splitting until a chunk holds at most this many triangles, regardless of cost.
    MaxTrianglesPerLeaf(usize),
}

/// Decides which split planes are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitStrategy {
    /// `candidate_splits_per_axis` evenly spaced planes on each of the three axes,
    /// ranked by surface area heuristic.
    SampledPlanes,

    /// A single plane through the center of the chunk bounds, on their longest axis.
    LongestAxisMidpoint,
}

/// Parameters of a BVH build.
///
/// # Examples
/// ```
/// use meshbvh::config::{BuildConfig, StopRule};
///
/// let config = BuildConfig::default()
///     .with_depth_limit(12)
///     .with_stop_rule(StopRule::MaxTrianglesPerLeaf(4));
/// assert!(config.validate().is_ok());
///
/// assert!(BuildConfig::default().with_depth_limit(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildConfig {
    /// Number of tree levels, in `[1, MAX_DEPTH_LIMIT]`. A limit of 1 yields a single
    /// leaf holding every triangle.
    pub depth_limit: u32,

    /// Number of planes tested per axis by [`SplitStrategy::SampledPlanes`].
    pub candidate_splits_per_axis: usize,

    /// When to stop splitting.
    pub stop_rule: StopRule,

    /// Which planes to test.
    pub split_strategy: SplitStrategy,

    /// Chunks with more triangles than this build their two subtrees in parallel.
    /// Only used with the `rayon` feature.
    pub parallel_threshold: usize,
}

impl Default for BuildConfig {
    fn default() -> BuildConfig {
        BuildConfig {
            depth_limit: 20,
            candidate_splits_per_axis: 5,
            stop_rule: StopRule::CostImprovement,
            split_strategy: SplitStrategy::SampledPlanes,
            parallel_threshold: 64,
        }
    }
}

impl BuildConfig {
    pub fn with_depth_limit(mut self, depth_limit: u32) -> BuildConfig {
        self.depth_limit = depth_limit;
        self
    }

    pub fn with_candidate_splits_per_axis(mut self, candidates: usize) -> BuildConfig {
        self.candidate_splits_per_axis = candidates;
        self
    }

    pub fn with_stop_rule(mut self, stop_rule: StopRule) -> BuildConfig {
        self.stop_rule = stop_rule;
        self
    }

    pub fn with_split_strategy(mut self, split_strategy: SplitStrategy) -> BuildConfig {
        self.split_strategy = split_strategy;
        self
    }

    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> BuildConfig {
        self.parallel_threshold = parallel_threshold;
        self
    }

    /// Checks that every parameter is inside its valid range.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DEPTH_LIMIT).contains(&self.depth_limit) {
            return Err(BvhError::InvalidConfig(format!(
                "depth_limit must be in [1, {}], got {}",
                MAX_DEPTH_LIMIT, self.depth_limit
            )));
        }
        if self.candidate_splits_per_axis == 0 {
            return Err(BvhError::InvalidConfig(
                "candidate_splits_per_axis must be at least 1".to_string(),
            ));
        }
        if self.stop_rule == StopRule::MaxTrianglesPerLeaf(0) {
            return Err(BvhError::InvalidConfig(
                "MaxTrianglesPerLeaf must allow at least 1 triangle".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{BuildConfig, SplitStrategy, StopRule, MAX_DEPTH_LIMIT};
    use crate::error::BvhError;

    #[test]
    fn test_default_is_valid() {
        let config = BuildConfig::default();
        assert_eq!(config.depth_limit, 20);
        assert_eq!(config.candidate_splits_per_axis, 5);
        assert_eq!(config.stop_rule, StopRule::CostImprovement);
        assert_eq!(config.split_strategy, SplitStrategy::SampledPlanes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_depth_limit_range() {
        assert!(BuildConfig::default().with_depth_limit(1).validate().is_ok());
        assert!(BuildConfig::default()
            .with_depth_limit(MAX_DEPTH_LIMIT)
            .validate()
            .is_ok());
        assert!(matches!(
            BuildConfig::default()
                .with_depth_limit(MAX_DEPTH_LIMIT + 1)
                .validate(),
            Err(BvhError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_counts() {
        assert!(BuildConfig::default()
            .with_candidate_splits_per_axis(0)
            .validate()
            .is_err());
        assert!(BuildConfig::default()
            .with_stop_rule(StopRule::MaxTrianglesPerLeaf(0))
            .validate()
            .is_err());
        assert!(BuildConfig::default()
            .with_stop_rule(StopRule::MaxTrianglesPerLeaf(1))
            .validate()
            .is_ok());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_config_from_json() {
        let config = BuildConfig::default()
            .with_depth_limit(8)
            .with_stop_rule(StopRule::MaxTrianglesPerLeaf(4))
            .with_split_strategy(SplitStrategy::LongestAxisMidpoint);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"depth_limit\":8"));
        let parsed: BuildConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert!(parsed.validate().is_ok());
    }
}
