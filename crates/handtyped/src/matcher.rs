//! Classifies a live pose against recorded reference poses.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    binding::{Binding, BindingSet},
    landmark::NormalizedPose,
};

/// Determines which binding wins when several are within the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Take the first binding (in [`BindingSet`] iteration order) that is within the threshold.
    ///
    /// The outcome depends on the order gestures were recorded in.
    First,
    /// Take the closest binding within the threshold. Of two equally close bindings, the earlier
    /// one wins.
    #[default]
    Best,
}

/// A successful match returned by [`PoseMatcher::find`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    binding: &'a Binding,
    distance: f32,
}

impl<'a> Match<'a> {
    pub fn binding(&self) -> &'a Binding {
        self.binding
    }

    pub fn label(&self) -> &'a str {
        self.binding.label()
    }

    /// Distance between the candidate and the matched reference pose.
    pub fn distance(&self) -> f32 {
        self.distance
    }
}

/// Computes the Euclidean distance between two poses.
///
/// All coordinates of a pose are treated as one flat vector, so this is the square root of the
/// summed squared differences over every landmark and axis.
///
/// Returns [`None`] if the poses have different numbers of landmarks.
pub fn distance(a: &NormalizedPose, b: &NormalizedPose) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let sum: f32 = a
        .positions()
        .iter()
        .zip_eq(b.positions())
        .map(|(a, b)| nalgebra::distance_squared(a, b))
        .sum();
    Some(sum.sqrt())
}

/// Nearest-neighbour classifier with a fixed distance threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseMatcher {
    threshold: f32,
    policy: MatchPolicy,
}

impl Default for PoseMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl PoseMatcher {
    pub const DEFAULT_THRESHOLD: f32 = 0.2;

    /// Creates a matcher using the default [`MatchPolicy`].
    ///
    /// # Panics
    ///
    /// This method panics if `threshold` is not a positive, finite number.
    pub fn new(threshold: f32) -> Self {
        assert!(
            threshold.is_finite() && threshold > 0.0,
            "match threshold must be positive and finite, got {threshold}"
        );
        Self {
            threshold,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(self, policy: MatchPolicy) -> Self {
        Self { policy, ..self }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Finds the binding whose reference pose matches `candidate`.
    ///
    /// A binding matches if its distance to `candidate` is strictly less than the threshold.
    /// Bindings whose pose has a different landmark count never match. Which of several matching
    /// bindings is returned depends on the [`MatchPolicy`].
    pub fn find<'a>(
        &self,
        candidate: &NormalizedPose,
        bindings: &'a BindingSet,
    ) -> Option<Match<'a>> {
        let mut matches = bindings.iter().filter_map(|binding| {
            let Some(distance) = distance(candidate, binding.pose()) else {
                log::trace!(
                    "skipping '{}': {} landmarks, candidate has {}",
                    binding.label(),
                    binding.pose().len(),
                    candidate.len(),
                );
                return None;
            };
            log::trace!("'{}' at distance {distance}", binding.label());

            (distance < self.threshold).then_some(Match { binding, distance })
        });

        match self.policy {
            MatchPolicy::First => matches.next(),
            MatchPolicy::Best => matches.fold(None, |best: Option<Match<'a>>, m| match best {
                Some(best) if best.distance <= m.distance => Some(best),
                _ => Some(m),
            }),
        }
    }

    /// Like [`PoseMatcher::find`], but only returns the label.
    pub fn match_label<'a>(
        &self,
        candidate: &NormalizedPose,
        bindings: &'a BindingSet,
    ) -> Option<&'a str> {
        self.find(candidate, bindings).map(|m| m.label())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::*;
    use crate::{
        hand::LandmarkIdx,
        landmark::{normalize, Pose},
        test,
    };

    fn set(entries: &[(&str, &Pose)]) -> BindingSet {
        entries
            .iter()
            .map(|(label, pose)| Binding::new(*label, normalize(pose).unwrap(), "space").unwrap())
            .collect()
    }

    fn norm(pose: &Pose) -> NormalizedPose {
        normalize(pose).unwrap()
    }

    #[test]
    fn self_match_always_succeeds() {
        let rng = fastrand::Rng::with_seed(0x0dd5_eed5);
        for _ in 0..50 {
            let pose = test::hand(rng.f32())
                .translated(Vector3::new(rng.f32() - 0.5, rng.f32() - 0.5, 0.0));
            let bindings = set(&[("gesture", &pose)]);
            for threshold in [1e-6, 0.2, 10.0] {
                let m = PoseMatcher::new(threshold).find(&norm(&pose), &bindings).unwrap();
                assert_eq!(m.label(), "gesture");
                assert_eq!(m.distance(), 0.0);
            }
        }
    }

    #[test]
    fn distance_is_euclidean_over_all_coordinates() {
        let a = Pose::from_coords([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let b = Pose::from_coords([[0.0, 0.0, 0.0], [1.0, 0.0, 2.0], [0.0, 2.0, 0.0]]);
        assert_relative_eq!(distance(&norm(&a), &norm(&b)).unwrap(), 5.0f32.sqrt());
        assert_eq!(distance(&norm(&a), &norm(&a)), Some(0.0));
    }

    #[test]
    fn threshold_is_strict() {
        let a = Pose::from_coords([[0.0, 0.0, 0.0], [0.5, 0.5, 0.0]]);
        let b = Pose::from_coords([[0.0, 0.0, 0.0], [0.5, 0.75, 0.0]]);
        let bindings = set(&[("b", &b)]);

        assert_eq!(distance(&norm(&a), &norm(&b)), Some(0.25));
        assert!(PoseMatcher::new(0.25).find(&norm(&a), &bindings).is_none());
        assert_eq!(PoseMatcher::new(0.251).match_label(&norm(&a), &bindings), Some("b"));
    }

    #[test]
    fn far_poses_never_match() {
        let bindings = set(&[("fist", &test::fist())]);
        let open = norm(&test::open_hand());
        let dist = distance(&open, bindings.get("fist").unwrap().pose()).unwrap();
        assert!(dist >= PoseMatcher::DEFAULT_THRESHOLD, "{dist}");

        for policy in [MatchPolicy::First, MatchPolicy::Best] {
            let matcher = PoseMatcher::default().with_policy(policy);
            assert!(matcher.find(&open, &bindings).is_none());
        }
        assert!(PoseMatcher::new(dist).find(&open, &bindings).is_none());
    }

    #[test]
    fn empty_set_never_matches() {
        let candidate = norm(&test::open_hand());
        for policy in [MatchPolicy::First, MatchPolicy::Best] {
            let matcher = PoseMatcher::new(1000.0).with_policy(policy);
            assert!(matcher.find(&candidate, &BindingSet::new()).is_none());
        }
    }

    #[test]
    fn different_landmark_counts_are_skipped() {
        let hand = test::open_hand();
        let short = Pose::from_coords(hand.positions().iter().take(20).map(|p| [p.x, p.y, p.z]));
        let bindings = set(&[("short", &short), ("full", &hand)]);

        let candidate = norm(&hand);
        assert_eq!(distance(&candidate, bindings.get("short").unwrap().pose()), None);

        let matcher = PoseMatcher::new(1000.0).with_policy(MatchPolicy::First);
        assert_eq!(matcher.match_label(&candidate, &bindings), Some("full"));

        let only_short = set(&[("short", &short)]);
        assert!(matcher.find(&candidate, &only_short).is_none());
    }

    #[test]
    fn near_and_far_candidates() {
        let pose_a = test::fist();
        let bindings = set(&[("fist", &pose_a)]);
        let matcher = PoseMatcher::default();

        let near = test::nudge(&pose_a, LandmarkIdx::IndexFingerTip, Vector3::new(0.03, 0.04, 0.0));
        let m = matcher.find(&norm(&near), &bindings).unwrap();
        assert_eq!(m.label(), "fist");
        assert_relative_eq!(m.distance(), 0.05, epsilon = 0.0001);

        let far = test::nudge(&pose_a, LandmarkIdx::IndexFingerTip, Vector3::new(0.3, 0.4, 0.0));
        assert!(matcher.find(&norm(&far), &bindings).is_none());
    }

    /// "fist" is recorded first and is within the threshold, but "open" is much closer.
    fn overlapping_bindings() -> (NormalizedPose, BindingSet) {
        let candidate = test::open_hand();
        let thumb = LandmarkIdx::ThumbTip;
        let fist_like = test::nudge(&candidate, thumb, Vector3::new(0.09, 0.12, 0.0));
        let open_like = test::nudge(&candidate, thumb, Vector3::new(0.0, 0.01, 0.0));
        let bindings = set(&[("fist", &fist_like), ("open", &open_like)]);

        let candidate = norm(&candidate);
        assert_relative_eq!(
            distance(&candidate, bindings.get("fist").unwrap().pose()).unwrap(),
            0.15,
            epsilon = 0.0001
        );
        assert_relative_eq!(
            distance(&candidate, bindings.get("open").unwrap().pose()).unwrap(),
            0.01,
            epsilon = 0.0001
        );
        (candidate, bindings)
    }

    #[test]
    fn first_policy_takes_earliest_binding() {
        let (candidate, bindings) = overlapping_bindings();
        let matcher = PoseMatcher::default().with_policy(MatchPolicy::First);
        assert_eq!(matcher.match_label(&candidate, &bindings), Some("fist"));
    }

    #[test]
    fn best_policy_takes_closest_binding() {
        let (candidate, bindings) = overlapping_bindings();
        assert_eq!(PoseMatcher::default().policy(), MatchPolicy::Best);
        assert_eq!(PoseMatcher::default().match_label(&candidate, &bindings), Some("open"));
    }

    #[test]
    fn best_policy_ties_keep_earlier_binding() {
        let pose = test::open_hand();
        let bindings = set(&[("first", &pose), ("second", &pose)]);
        assert_eq!(PoseMatcher::default().match_label(&norm(&pose), &bindings), Some("first"));
    }

    #[test]
    #[should_panic]
    fn rejects_non_positive_threshold() {
        PoseMatcher::new(0.0);
    }
}
