// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Confidence filtering for keypoints and skeleton edges.

use crate::pose::{Keypoint, Pose};

/// Default minimum confidence for a keypoint to be drawn.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Keypoints and edges that passed the confidence filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredPose {
    /// Keypoints with confidence strictly above the threshold.
    pub keypoints: Vec<Keypoint>,
    /// Edges whose two endpoints both passed, as `(start, end)` keypoints.
    pub edges: Vec<(Keypoint, Keypoint)>,
}

impl FilteredPose {
    /// Check if nothing passed the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty() && self.edges.is_empty()
    }
}

/// Keep keypoints with `confidence > threshold` and edges whose endpoints both qualify.
///
/// Edges referencing a keypoint the pose does not carry are dropped.
#[must_use]
pub fn filter_pose(pose: &Pose, skeleton: &[[usize; 2]], threshold: f32) -> FilteredPose {
    let keypoints = pose
        .keypoints()
        .iter()
        .filter(|k| k.passes(threshold))
        .copied()
        .collect();

    let edges = skeleton
        .iter()
        .filter_map(|&[a, b]| {
            let start = pose.get(a).filter(|k| k.passes(threshold))?;
            let end = pose.get(b).filter(|k| k.passes(threshold))?;
            Some((*start, *end))
        })
        .collect();

    FilteredPose { keypoints, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::NUM_KEYPOINTS;
    use crate::visualizer::skeleton::SKELETON;

    fn pose_with(confidences: &[(usize, f32)]) -> Pose {
        let mut triples = vec![(0.0, 0.0, 0.0); NUM_KEYPOINTS];
        for &(i, c) in confidences {
            triples[i] = (i as f32 * 10.0, i as f32 * 5.0, c);
        }
        Pose::from_triples(&triples)
    }

    #[test]
    fn test_threshold_boundary() {
        let pose = pose_with(&[(0, 0.6), (1, 0.6001), (2, 0.59), (3, 1.0)]);
        let filtered = filter_pose(&pose, &SKELETON, DEFAULT_CONFIDENCE_THRESHOLD);

        let ids: Vec<usize> = filtered.keypoints.iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_edge_needs_both_endpoints() {
        let pose = pose_with(&[(5, 0.5), (7, 0.9)]);
        let filtered = filter_pose(&pose, &SKELETON, DEFAULT_CONFIDENCE_THRESHOLD);

        assert!(filtered.edges.is_empty());
        assert_eq!(filtered.keypoints.len(), 1);
        assert_eq!(filtered.keypoints[0].id, 7);
    }

    #[test]
    fn test_edge_kept_when_both_pass() {
        let pose = pose_with(&[(5, 0.7), (7, 0.9), (9, 0.95)]);
        let filtered = filter_pose(&pose, &SKELETON, DEFAULT_CONFIDENCE_THRESHOLD);

        let pairs: Vec<(usize, usize)> = filtered.edges.iter().map(|(a, b)| (a.id, b.id)).collect();
        assert_eq!(pairs, vec![(5, 7), (7, 9)]);
    }

    #[test]
    fn test_missing_keypoints_are_excluded() {
        let pose = Pose::from_triples(&[(1.0, 1.0, 0.9), (2.0, 2.0, 0.9)]);
        let filtered = filter_pose(&pose, &SKELETON, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(filtered.keypoints.len(), 2);
        let pairs: Vec<(usize, usize)> = filtered.edges.iter().map(|(a, b)| (a.id, b.id)).collect();
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_empty_pose() {
        let filtered = filter_pose(&Pose::default(), &SKELETON, DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(filtered.is_empty());
    }
}
