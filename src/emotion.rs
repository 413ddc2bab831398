use serde::Serialize;

use crate::config::EmotionConfig;
use crate::error::ThresholdError;

/// スコアから導く表情状態（保存はしない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionState {
    Confused,
    Focused,
    Happy,
    Celebrate,
}

/// 昇順の 3 閾値 t1 < t2 < t3
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionThresholds {
    confused: f32,
    focused: f32,
    happy: f32,
}

impl EmotionThresholds {
    pub fn new(confused: f32, focused: f32, happy: f32) -> Result<Self, ThresholdError> {
        validate_tiers(confused, focused, happy)?;
        Ok(Self {
            confused,
            focused,
            happy,
        })
    }

    pub fn from_config(config: &EmotionConfig) -> Result<Self, ThresholdError> {
        Self::new(config.confused, config.focused, config.happy)
    }

    /// ≤t1 Confused, ≤t2 Focused, ≤t3 Happy, それ以上 Celebrate
    pub fn classify(&self, score: f32) -> EmotionState {
        if score.is_nan() || score <= self.confused {
            EmotionState::Confused
        } else if score <= self.focused {
            EmotionState::Focused
        } else if score <= self.happy {
            EmotionState::Happy
        } else {
            EmotionState::Celebrate
        }
    }
}

impl Default for EmotionThresholds {
    fn default() -> Self {
        Self {
            confused: 0.4,
            focused: 0.7,
            happy: 0.9,
        }
    }
}

pub(crate) fn validate_tiers(t1: f32, t2: f32, t3: f32) -> Result<(), ThresholdError> {
    if (0.0..=1.0).contains(&t1) && t1 < t2 && t2 < t3 && t3 <= 1.0 {
        Ok(())
    } else {
        Err(ThresholdError(t1, t2, t3))
    }
}
