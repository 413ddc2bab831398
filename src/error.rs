//! Error types for the pose pipeline.

use thiserror::Error;

use crate::pose::Keypoint;

/// Failures reported by a pose detector capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),

    #[error("detection failed: {0}")]
    Inference(String),

    #[error("frame rejected: {0}")]
    InvalidFrame(String),
}

/// Failures of the acquisition loop lifecycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    #[error("pose detector could not be acquired: {0}")]
    CapabilityUnavailable(#[source] DetectorError),

    #[error("acquisition loop is {0}, expected {1}")]
    InvalidState(&'static str, &'static str),
}

/// Failures loading a target skeleton.
#[derive(Error, Debug)]
pub enum SkeletonError {
    #[error("target skeleton is missing keypoint {0}")]
    MissingKeypoint(Keypoint),

    #[error("failed to read target skeleton: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse target skeleton: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Threshold triples must be ordered and within [0, 1].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("thresholds must satisfy 0 <= {0} < {1} < {2} <= 1")]
pub struct ThresholdError(pub f32, pub f32, pub f32);

/// Failures of the external advice service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdviceError {
    #[error("advice service unavailable: {0}")]
    Unavailable(String),

    #[error("advice service timed out")]
    Timeout,
}
