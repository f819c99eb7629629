// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose data model.
//!
//! A [`Pose`] is the per-frame output of a single-pose estimator: up to 17
//! [`Keypoint`]s in COCO body ordering, positioned in source-video pixel space.

/// Number of body landmarks in a full pose.
pub const NUM_KEYPOINTS: usize = 17;

/// COCO body landmark ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    /// All landmarks in index order.
    pub const ALL: [Self; NUM_KEYPOINTS] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// Look up a landmark by its numeric index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Numeric index of this landmark.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable landmark name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// The same landmark on the opposite side of the body.
    ///
    /// Used when mirroring a pose horizontally.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::Nose => Self::Nose,
            Self::LeftEye => Self::RightEye,
            Self::RightEye => Self::LeftEye,
            Self::LeftEar => Self::RightEar,
            Self::RightEar => Self::LeftEar,
            Self::LeftShoulder => Self::RightShoulder,
            Self::RightShoulder => Self::LeftShoulder,
            Self::LeftElbow => Self::RightElbow,
            Self::RightElbow => Self::LeftElbow,
            Self::LeftWrist => Self::RightWrist,
            Self::RightWrist => Self::LeftWrist,
            Self::LeftHip => Self::RightHip,
            Self::RightHip => Self::LeftHip,
            Self::LeftKnee => Self::RightKnee,
            Self::RightKnee => Self::LeftKnee,
            Self::LeftAnkle => Self::RightAnkle,
            Self::RightAnkle => Self::LeftAnkle,
        }
    }
}

/// A single detected landmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Landmark index (0-16).
    pub id: usize,
    /// X coordinate in source pixels.
    pub x: f32,
    /// Y coordinate in source pixels.
    pub y: f32,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
}

impl Keypoint {
    /// Create a new keypoint.
    #[must_use]
    pub const fn new(id: usize, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            id,
            x,
            y,
            confidence,
        }
    }

    /// Position as `(x, y)`.
    #[must_use]
    pub const fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Whether position and confidence are all finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.confidence.is_finite()
    }

    /// Whether the keypoint is strictly above `threshold`.
    #[must_use]
    pub fn passes(&self, threshold: f32) -> bool {
        self.is_finite() && self.confidence > threshold
    }
}

/// Keypoints for a single detected subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    keypoints: Vec<Keypoint>,
}

impl Pose {
    /// Build a pose from keypoints in landmark order.
    ///
    /// Entries beyond [`NUM_KEYPOINTS`] are dropped. Each keypoint's `id` is
    /// set to its slot.
    #[must_use]
    pub fn new(mut keypoints: Vec<Keypoint>) -> Self {
        keypoints.truncate(NUM_KEYPOINTS);
        for (id, kp) in keypoints.iter_mut().enumerate() {
            kp.id = id;
        }
        Self { keypoints }
    }

    /// Build a pose from `(x, y, confidence)` triples, assigning ids by position.
    #[must_use]
    pub fn from_triples(triples: &[(f32, f32, f32)]) -> Self {
        Self::new(
            triples
                .iter()
                .enumerate()
                .map(|(id, &(x, y, c))| Keypoint::new(id, x, y, c))
                .collect(),
        )
    }

    /// Keypoint at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    /// All keypoints in landmark order.
    #[must_use]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Number of keypoints carried.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Check if the pose carries no keypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Mean confidence across keypoints, 0 for an empty pose.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        self.keypoints.iter().map(|k| k.confidence).sum::<f32>() / self.keypoints.len() as f32
    }

    /// Mirror the pose around the vertical line `x = width / 2`.
    ///
    /// Left and right landmarks swap slots so ids keep their meaning.
    #[must_use]
    pub fn flipped_horizontal(&self, width: f32) -> Self {
        let target =
            |id: usize| KeypointIndex::from_index(id).map_or(id, |k| k.mirrored().index());
        let len = self
            .keypoints
            .iter()
            .map(|kp| target(kp.id) + 1)
            .max()
            .unwrap_or(0);

        let mut slots: Vec<Option<Keypoint>> = vec![None; len];
        for kp in &self.keypoints {
            let id = target(kp.id);
            slots[id] = Some(Keypoint::new(id, width - kp.x, kp.y, kp.confidence));
        }
        Self::new(
            slots
                .into_iter()
                .enumerate()
                .map(|(i, slot)| slot.unwrap_or(Keypoint::new(i, 0.0, 0.0, 0.0)))
                .collect(),
        )
    }
}
