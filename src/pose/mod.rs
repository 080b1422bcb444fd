pub mod angles;
pub mod geometry;
pub mod keypoint;

pub use angles::{AngleName, AngleSpec, JointAngleSet};
pub use geometry::{alignment_angle, angle_at, angle_difference};
pub use keypoint::{JointName, Keypoint, Point, Skeleton, SkeletonSample};
