//! Per-frame fan-out: smoothed landmarks into score, rig signals, emotion and guidance.

use crate::config::Config;
use crate::emotion::{EmotionState, EmotionThresholds};
use crate::error::ThresholdError;
use crate::feedback::FeedbackComposer;
use crate::pose::{LandmarkMap, Skeleton};
use crate::rig::{map_rig, RigSignals};
use crate::score::Scorer;
use crate::tracker::{FrameSample, LoopStatus};

/// Derived outputs for one landmark map.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub score: f32,
    pub rig: RigSignals,
    pub emotion: EmotionState,
    pub feedback: &'static str,
}

/// Everything the consumer receives for one processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub sample: FrameSample,
    pub status: LoopStatus,
    pub assessment: Assessment,
}

#[derive(Debug, Clone)]
pub struct Coach {
    scorer: Scorer,
    emotion: EmotionThresholds,
    feedback: FeedbackComposer,
    target: Option<Skeleton>,
}

impl Coach {
    pub fn new(
        scorer: Scorer,
        emotion: EmotionThresholds,
        feedback: FeedbackComposer,
        target: Option<Skeleton>,
    ) -> Self {
        Self {
            scorer,
            emotion,
            feedback,
            target,
        }
    }

    pub fn from_config(config: &Config, target: Option<Skeleton>) -> Result<Self, ThresholdError> {
        Ok(Self::new(
            Scorer::from_config(&config.score),
            EmotionThresholds::from_config(&config.emotion)?,
            FeedbackComposer::from_config(&config.feedback)?,
            target,
        ))
    }

    pub fn feedback(&self) -> &FeedbackComposer {
        &self.feedback
    }

    pub fn assess(&self, landmarks: &LandmarkMap) -> Assessment {
        let score = self.scorer.score(landmarks, self.target.as_ref());
        Assessment {
            score,
            rig: map_rig(landmarks),
            emotion: self.emotion.classify(score),
            feedback: self.feedback.compose(score, landmarks),
        }
    }

    pub fn report(&self, sample: FrameSample, status: LoopStatus) -> FrameReport {
        let assessment = self.assess(&sample.smoothed);
        FrameReport {
            sample,
            status,
            assessment,
        }
    }
}

impl Default for Coach {
    fn default() -> Self {
        Self::new(
            Scorer::default(),
            EmotionThresholds::default(),
            FeedbackComposer::default(),
            None,
        )
    }
}
