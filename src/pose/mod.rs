pub mod detector;
pub mod keypoint;
#[cfg(feature = "onnx")]
pub mod movenet;
pub mod normalize;
#[cfg(feature = "onnx")]
pub mod preprocess;

pub use detector::{PoseDetector, RawDetection, RawKeypoint, DETECTOR_KEYPOINTS};
pub use keypoint::{Keypoint, Landmark, LandmarkMap, Skeleton, SkeletonPoint, PRIORITY_KEYPOINTS};
#[cfg(feature = "onnx")]
pub use movenet::MoveNetDetector;
pub use normalize::normalize;
#[cfg(feature = "onnx")]
pub use preprocess::preprocess_for_movenet;
