//! Hand poses and their normalization.

use std::ops::Index;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hand::LandmarkIdx;

/// Position of a single landmark.
pub type Position = Point3<f32>;

/// Reasons a [`Pose`] cannot be used for matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoseError {
    #[error("pose contains no landmarks")]
    Empty,
    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// An ordered list of landmark positions describing one hand at one instant.
///
/// Landmark order is significant: index `i` refers to the same anatomical landmark in every pose
/// produced by the same extractor (see [`LandmarkIdx`]).
///
/// Serialized as a list of `[x, y, z]` triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<[f32; 3]>", into = "Vec<[f32; 3]>")]
pub struct Pose {
    positions: Box<[Position]>,
}

impl Pose {
    /// Creates a pose from `[x, y, z]` coordinate triples.
    pub fn from_coords(coords: impl IntoIterator<Item = [f32; 3]>) -> Self {
        coords.into_iter().map(Position::from).collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn get(&self, index: usize) -> Option<Position> {
        self.positions.get(index).copied()
    }

    /// Returns a copy of this pose with every landmark moved by `offset`.
    pub fn translated(&self, offset: Vector3<f32>) -> Self {
        self.positions.iter().map(|p| p + offset).collect()
    }

    /// Checks that the pose has exactly `expected` landmarks.
    pub fn check_len(&self, expected: usize) -> Result<(), PoseError> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(PoseError::LandmarkCount {
                expected,
                actual: self.len(),
            })
        }
    }

    /// Translates the pose so that [`LandmarkIdx::ORIGIN`] ends up at the origin.
    ///
    /// See [`normalize`].
    pub fn normalize(&self) -> Result<NormalizedPose, PoseError> {
        normalize(self)
    }
}

impl FromIterator<Position> for Pose {
    fn from_iter<T: IntoIterator<Item = Position>>(iter: T) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<[f32; 3]>> for Pose {
    fn from(coords: Vec<[f32; 3]>) -> Self {
        Self::from_coords(coords)
    }
}

impl From<Pose> for Vec<[f32; 3]> {
    fn from(pose: Pose) -> Self {
        pose.positions.iter().map(|p| [p.x, p.y, p.z]).collect()
    }
}

impl Index<usize> for Pose {
    type Output = Position;

    fn index(&self, index: usize) -> &Position {
        &self.positions[index]
    }
}

impl Index<LandmarkIdx> for Pose {
    type Output = Position;

    fn index(&self, index: LandmarkIdx) -> &Position {
        &self.positions[index.index()]
    }
}

/// A [`Pose`] whose origin landmark sits exactly at `(0, 0, 0)`.
///
/// The only way to obtain one is through [`normalize`], which also applies when deserializing.
/// Since normalizing an already normalized pose changes nothing, stored poses can be loaded
/// regardless of whether they were normalized when written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Pose", into = "Pose")]
pub struct NormalizedPose(Pose);

impl NormalizedPose {
    pub fn pose(&self) -> &Pose {
        &self.0
    }

    pub fn positions(&self) -> &[Position] {
        self.0.positions()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with [`Pose`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_pose(self) -> Pose {
        self.0
    }
}

impl TryFrom<Pose> for NormalizedPose {
    type Error = PoseError;

    fn try_from(pose: Pose) -> Result<Self, PoseError> {
        normalize(&pose)
    }
}

impl From<NormalizedPose> for Pose {
    fn from(pose: NormalizedPose) -> Self {
        pose.0
    }
}

/// Makes `pose` translation-invariant by subtracting the origin landmark from every landmark.
///
/// The result has the same length and landmark order as `pose`, and its origin landmark is exactly
/// `(0, 0, 0)`. The same hand shape seen at different places in the camera image normalizes to the
/// same pose, up to sensor noise.
///
/// # Errors
///
/// Fails with [`PoseError::Empty`] if `pose` has no landmarks and with [`PoseError::NonFinite`] if
/// any coordinate is NaN or infinite (the origin could not be subtracted exactly).
pub fn normalize(pose: &Pose) -> Result<NormalizedPose, PoseError> {
    let origin = pose.get(LandmarkIdx::ORIGIN.index()).ok_or(PoseError::Empty)?;
    if let Some(index) = pose
        .positions()
        .iter()
        .position(|p| !p.coords.iter().all(|c| c.is_finite()))
    {
        return Err(PoseError::NonFinite { index });
    }

    Ok(NormalizedPose(
        pose.positions()
            .iter()
            .map(|p| Position::from(p - origin))
            .collect(),
    ))
}

/// Capture-mode entry point: normalizes the pose of a detected hand for recording.
///
/// Returns `Ok(None)` if no hand was detected, so the caller can ask the user to try again.
pub fn capture(detected: Option<&Pose>) -> Result<Option<NormalizedPose>, PoseError> {
    detected.map(normalize).transpose()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use itertools::Itertools;

    use super::*;
    use crate::{hand::NUM_LANDMARKS, test};

    const MAX_DELTA: f32 = 0.00001;

    fn random_pose(rng: &fastrand::Rng, len: usize) -> Pose {
        (0..len)
            .map(|_| Position::new(rng.f32(), rng.f32(), rng.f32() * 0.2 - 0.1))
            .collect()
    }

    #[test]
    fn origin_is_exactly_zero() {
        let rng = fastrand::Rng::with_seed(0x5eed_0001);
        for len in 1..=NUM_LANDMARKS {
            let norm = normalize(&random_pose(&rng, len)).unwrap();
            assert_eq!(norm.positions()[0], Position::origin());
            assert_eq!(norm.len(), len);
        }
    }

    #[test]
    fn relative_geometry_is_kept() {
        let pose = Pose::from_coords([[0.5, 0.5, 0.0], [0.6, 0.4, -0.02], [0.25, 1.0, 0.5]]);
        let norm = normalize(&pose).unwrap();
        assert_relative_eq!(
            norm.positions()[1],
            Position::new(0.1, -0.1, -0.02),
            epsilon = MAX_DELTA
        );
        assert_relative_eq!(
            norm.positions()[2],
            Position::new(-0.25, 0.5, 0.5),
            epsilon = MAX_DELTA
        );
    }

    #[test]
    fn translation_invariance() {
        let rng = fastrand::Rng::with_seed(0x3024b6663d843ca2);
        for _ in 0..100 {
            let pose = random_pose(&rng, NUM_LANDMARKS);
            let offset = Vector3::new(
                rng.f32() * 2.0 - 1.0,
                rng.f32() * 2.0 - 1.0,
                rng.f32() - 0.5,
            );
            let a = normalize(&pose).unwrap();
            let b = normalize(&pose.translated(offset)).unwrap();
            for (a, b) in a.positions().iter().zip_eq(b.positions()) {
                assert_relative_eq!(a, b, epsilon = MAX_DELTA);
            }
        }
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let once = normalize(&test::open_hand()).unwrap();
        let twice = normalize(once.pose()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_pose_is_rejected() {
        assert_eq!(normalize(&Pose::from_coords([])), Err(PoseError::Empty));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let pose = Pose::from_coords([[0.0, 0.0, 0.0], [1.0, f32::NAN, 0.0]]);
        assert_eq!(normalize(&pose), Err(PoseError::NonFinite { index: 1 }));
    }

    #[test]
    fn check_len() {
        let pose = test::open_hand();
        assert_eq!(pose.check_len(NUM_LANDMARKS), Ok(()));
        assert_eq!(
            pose.check_len(20),
            Err(PoseError::LandmarkCount {
                expected: 20,
                actual: NUM_LANDMARKS
            })
        );
    }

    #[test]
    fn capture_without_hand() {
        assert_eq!(capture(None), Ok(None));
        let pose = test::fist();
        let captured = capture(Some(&pose)).unwrap().unwrap();
        assert_eq!(captured, normalize(&pose).unwrap());
    }

    #[test]
    fn deserializing_normalizes() {
        let norm: NormalizedPose =
            serde_json::from_str("[[0.5, 0.5, 0.0], [0.75, 0.25, 0.5]]").unwrap();
        assert_eq!(norm.positions()[0], Position::origin());
        assert_relative_eq!(norm.positions()[1], Position::new(0.25, -0.25, 0.5));

        assert!(serde_json::from_str::<NormalizedPose>("[]").is_err());
    }
}
