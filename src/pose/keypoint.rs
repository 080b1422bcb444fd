use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Joints reported by the skeletal keypoint detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum JointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    Neck = 5,
    LeftShoulder = 6,
    RightShoulder = 7,
    LeftElbow = 8,
    RightElbow = 9,
    LeftWrist = 10,
    RightWrist = 11,
    Root = 12,
    LeftHip = 13,
    RightHip = 14,
    LeftKnee = 15,
    RightKnee = 16,
    LeftAnkle = 17,
    RightAnkle = 18,
}

impl JointName {
    pub const COUNT: usize = 19;

    pub const ALL: [JointName; JointName::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::Neck,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::Root,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Wire name, as used in baseline files and skeleton samples
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::Neck => "neck",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::Root => "root",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }

    /// Human readable form for correction messages ("left hip")
    pub fn display_name(&self) -> String {
        let mut out = String::new();
        for c in self.as_str().chars() {
            if c.is_ascii_uppercase() {
                out.push(' ');
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|j| j.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown joint name: {}", s))
    }
}

/// A single detected joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Normalized X (0.0..1.0)
    pub x: f64,
    /// Normalized Y (0.0..1.0), origin at the bottom edge
    pub y: f64,
    /// Detector confidence (0.0..1.0)
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// 2D point in normalized image space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One detector output. Joints the detector did not report are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    joints: [Option<Keypoint>; JointName::COUNT],
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, joint: JointName, keypoint: Keypoint) -> Self {
        self.set(joint, keypoint);
        self
    }

    pub fn set(&mut self, joint: JointName, keypoint: Keypoint) {
        self.joints[joint as usize] = Some(keypoint);
    }

    pub fn get(&self, joint: JointName) -> Option<&Keypoint> {
        self.joints[joint as usize].as_ref()
    }

    pub fn point(&self, joint: JointName) -> Option<Point> {
        self.get(joint).map(Keypoint::point)
    }

    /// Detected joints in enumeration order
    pub fn detected(&self) -> impl Iterator<Item = (JointName, &Keypoint)> {
        JointName::ALL
            .iter()
            .zip(self.joints.iter())
            .filter_map(|(j, kp)| kp.as_ref().map(|kp| (*j, kp)))
    }

    pub fn detected_count(&self) -> usize {
        self.joints.iter().filter(|kp| kp.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.detected_count() == 0
    }

    /// Mean confidence over detected joints; `None` when nothing was detected
    pub fn average_confidence(&self) -> Option<f64> {
        let count = self.detected_count();
        if count == 0 {
            return None;
        }
        let sum: f64 = self.detected().map(|(_, kp)| kp.confidence).sum();
        Some(sum / count as f64)
    }
}

impl From<BTreeMap<JointName, Keypoint>> for Skeleton {
    fn from(map: BTreeMap<JointName, Keypoint>) -> Self {
        let mut skeleton = Skeleton::new();
        for (joint, kp) in map {
            skeleton.set(joint, kp);
        }
        skeleton
    }
}

/// Skeleton sample as it arrives on the wire (one JSON object per frame)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonSample {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub joints: BTreeMap<JointName, Keypoint>,
}

impl SkeletonSample {
    pub fn skeleton(&self) -> Skeleton {
        Skeleton::from(self.joints.clone())
    }
}
