use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::geometry::{alignment_angle, angle_at};
use super::keypoint::{JointName, Skeleton};

/// Named angles the scorer and the correction generator work with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AngleName {
    SpineAngle,
    HipAlignment,
    ShoulderAlignment,
    LeftHipAngle,
    RightHipAngle,
    LeftKneeAngle,
    RightKneeAngle,
    LeftElbowAngle,
    RightElbowAngle,
    LeftShoulderAngle,
    RightShoulderAngle,
    NeckAngle,
}

/// How an angle is measured from the skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleSpec {
    /// Bend at `vertex` between the rays to `a` and `c`
    Joint {
        a: JointName,
        vertex: JointName,
        c: JointName,
    },
    /// Direction of the vector `from → to`
    Alignment { to: JointName, from: JointName },
}

impl AngleSpec {
    /// Joint reported to the user when this angle is off
    pub fn focus_joint(&self) -> JointName {
        match *self {
            AngleSpec::Joint { vertex, .. } => vertex,
            AngleSpec::Alignment { to, .. } => to,
        }
    }

    /// Measures the angle; `None` when any required joint is missing
    pub fn measure(&self, skeleton: &Skeleton) -> Option<f64> {
        match *self {
            AngleSpec::Joint { a, vertex, c } => Some(angle_at(
                skeleton.point(a)?,
                skeleton.point(vertex)?,
                skeleton.point(c)?,
            )),
            AngleSpec::Alignment { to, from } => {
                Some(alignment_angle(skeleton.point(to)?, skeleton.point(from)?))
            }
        }
    }
}

impl AngleName {
    pub const COUNT: usize = 12;

    pub const ALL: [AngleName; AngleName::COUNT] = [
        Self::SpineAngle,
        Self::HipAlignment,
        Self::ShoulderAlignment,
        Self::LeftHipAngle,
        Self::RightHipAngle,
        Self::LeftKneeAngle,
        Self::RightKneeAngle,
        Self::LeftElbowAngle,
        Self::RightElbowAngle,
        Self::LeftShoulderAngle,
        Self::RightShoulderAngle,
        Self::NeckAngle,
    ];

    /// Joint triplet (or pair) each angle is computed from
    pub fn spec(&self) -> AngleSpec {
        use JointName::*;
        match self {
            Self::SpineAngle => AngleSpec::Alignment { to: Neck, from: Root },
            Self::HipAlignment => AngleSpec::Alignment { to: LeftHip, from: RightHip },
            Self::ShoulderAlignment => AngleSpec::Alignment {
                to: LeftShoulder,
                from: RightShoulder,
            },
            Self::LeftHipAngle => AngleSpec::Joint {
                a: LeftShoulder,
                vertex: LeftHip,
                c: LeftKnee,
            },
            Self::RightHipAngle => AngleSpec::Joint {
                a: RightShoulder,
                vertex: RightHip,
                c: RightKnee,
            },
            Self::LeftKneeAngle => AngleSpec::Joint {
                a: LeftHip,
                vertex: LeftKnee,
                c: LeftAnkle,
            },
            Self::RightKneeAngle => AngleSpec::Joint {
                a: RightHip,
                vertex: RightKnee,
                c: RightAnkle,
            },
            Self::LeftElbowAngle => AngleSpec::Joint {
                a: LeftShoulder,
                vertex: LeftElbow,
                c: LeftWrist,
            },
            Self::RightElbowAngle => AngleSpec::Joint {
                a: RightShoulder,
                vertex: RightElbow,
                c: RightWrist,
            },
            Self::LeftShoulderAngle => AngleSpec::Joint {
                a: Neck,
                vertex: LeftShoulder,
                c: LeftElbow,
            },
            Self::RightShoulderAngle => AngleSpec::Joint {
                a: Neck,
                vertex: RightShoulder,
                c: RightElbow,
            },
            Self::NeckAngle => AngleSpec::Joint {
                a: LeftShoulder,
                vertex: Neck,
                c: RightShoulder,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpineAngle => "spineAngle",
            Self::HipAlignment => "hipAlignment",
            Self::ShoulderAlignment => "shoulderAlignment",
            Self::LeftHipAngle => "leftHipAngle",
            Self::RightHipAngle => "rightHipAngle",
            Self::LeftKneeAngle => "leftKneeAngle",
            Self::RightKneeAngle => "rightKneeAngle",
            Self::LeftElbowAngle => "leftElbowAngle",
            Self::RightElbowAngle => "rightElbowAngle",
            Self::LeftShoulderAngle => "leftShoulderAngle",
            Self::RightShoulderAngle => "rightShoulderAngle",
            Self::NeckAngle => "neckAngle",
        }
    }
}

impl fmt::Display for AngleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AngleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown angle name: {}", s))
    }
}

/// Angles measured from one skeleton sample, in degrees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointAngleSet {
    angles: BTreeMap<AngleName, f64>,
}

impl JointAngleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measures every angle whose joints are all present
    pub fn from_skeleton(skeleton: &Skeleton) -> Self {
        let angles = AngleName::ALL
            .iter()
            .filter_map(|name| name.spec().measure(skeleton).map(|deg| (*name, deg)))
            .collect();
        Self { angles }
    }

    pub fn with(mut self, name: AngleName, degrees: f64) -> Self {
        self.angles.insert(name, degrees);
        self
    }

    pub fn get(&self, name: AngleName) -> Option<f64> {
        self.angles.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AngleName, f64)> + '_ {
        self.angles.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

impl FromIterator<(AngleName, f64)> for JointAngleSet {
    fn from_iter<I: IntoIterator<Item = (AngleName, f64)>>(iter: I) -> Self {
        Self {
            angles: iter.into_iter().collect(),
        }
    }
}
