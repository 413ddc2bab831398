use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::FeedbackConfig;
use crate::emotion::{validate_tiers, EmotionState};
use crate::error::{AdviceError, ThresholdError};
use crate::pose::{Keypoint, LandmarkMap, PRIORITY_KEYPOINTS};

pub const REPOSITION: &str = "Step back so your head, arms and hips are all in view";
pub const TRY_POSE: &str = "Copy the pose shown on screen";
pub const GETTING_CLOSER: &str = "Getting closer, adjust your arms";
pub const ALMOST_THERE: &str = "Almost there, hold it steady";
pub const PERFECT_MATCH: &str = "Perfect match!";

/// 外部アドバイスサービスへの入力
#[derive(Debug, Clone, Serialize)]
pub struct AdviceRequest {
    pub score: f32,
    pub emotion: EmotionState,
    /// 固定メッセージ（サービスが使えない時はこれを返す）
    pub fallback: &'static str,
    pub visible_keypoints: Vec<Keypoint>,
}

/// 文章生成によるアドバイスサービス。1 行のテキストを返す
#[async_trait]
pub trait AdviceService: Send + Sync {
    async fn advise(&self, request: &AdviceRequest) -> Result<String, AdviceError>;
}

/// スコアと可視性からガイダンス文を選ぶ
#[derive(Debug, Clone)]
pub struct FeedbackComposer {
    try_pose: f32,
    getting_closer: f32,
    almost_there: f32,
    visibility_gate: f32,
    min_visible: usize,
    advice_timeout: Duration,
}

impl FeedbackComposer {
    pub fn from_config(config: &FeedbackConfig) -> Result<Self, ThresholdError> {
        validate_tiers(config.try_pose, config.getting_closer, config.almost_there)?;
        Ok(Self {
            try_pose: config.try_pose,
            getting_closer: config.getting_closer,
            almost_there: config.almost_there,
            visibility_gate: config.visibility_gate,
            min_visible: config.min_visible,
            advice_timeout: Duration::from_millis(config.advice_timeout_ms),
        })
    }

    /// 可視度が未設定、または gate を超える優先キーポイント
    pub fn visible_keypoints(&self, landmarks: &LandmarkMap) -> Vec<Keypoint> {
        PRIORITY_KEYPOINTS
            .iter()
            .copied()
            .filter(|&k| {
                landmarks
                    .get(k)
                    .is_some_and(|lm| lm.visibility.map_or(true, |v| v > self.visibility_gate))
            })
            .collect()
    }

    /// 見えている点が足りなければスコアに関係なく位置調整を促す
    pub fn compose(&self, score: f32, landmarks: &LandmarkMap) -> &'static str {
        if self.visible_keypoints(landmarks).len() < self.min_visible {
            return REPOSITION;
        }
        self.tier(score)
    }

    fn tier(&self, score: f32) -> &'static str {
        if score.is_nan() || score <= self.try_pose {
            TRY_POSE
        } else if score <= self.getting_closer {
            GETTING_CLOSER
        } else if score <= self.almost_there {
            ALMOST_THERE
        } else {
            PERFECT_MATCH
        }
    }

    /// アドバイスサービスの文を使う。失敗・タイムアウト・空文字なら固定文
    pub async fn compose_with_advice(
        &self,
        service: &dyn AdviceService,
        score: f32,
        emotion: EmotionState,
        landmarks: &LandmarkMap,
    ) -> String {
        let visible_keypoints = self.visible_keypoints(landmarks);
        if visible_keypoints.len() < self.min_visible {
            return REPOSITION.to_string();
        }
        let request = AdviceRequest {
            score,
            emotion,
            fallback: self.tier(score),
            visible_keypoints,
        };

        match tokio::time::timeout(self.advice_timeout, service.advise(&request)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => request.fallback.to_string(),
            Ok(Err(e)) => {
                debug!("advice unavailable: {}", e);
                request.fallback.to_string()
            }
            Err(_) => {
                debug!("{}", AdviceError::Timeout);
                request.fallback.to_string()
            }
        }
    }
}

impl Default for FeedbackComposer {
    fn default() -> Self {
        Self {
            try_pose: 0.4,
            getting_closer: 0.7,
            almost_there: 0.9,
            visibility_gate: 0.45,
            min_visible: 6,
            advice_timeout: Duration::from_millis(800),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;

    fn all_visible(visibility: Option<f32>) -> LandmarkMap {
        PRIORITY_KEYPOINTS
            .iter()
            .map(|&k| {
                let mut lm = Landmark::new(0.5, 0.5, 0.0);
                lm.visibility = visibility;
                (k, lm)
            })
            .collect()
    }

    #[test]
    fn test_tiers() {
        let composer = FeedbackComposer::default();
        let pose = all_visible(Some(0.9));
        assert_eq!(composer.compose(0.0, &pose), TRY_POSE);
        assert_eq!(composer.compose(0.4, &pose), TRY_POSE);
        assert_eq!(composer.compose(0.5, &pose), GETTING_CLOSER);
        assert_eq!(composer.compose(0.8, &pose), ALMOST_THERE);
        assert_eq!(composer.compose(0.99, &pose), PERFECT_MATCH);
    }

    #[test]
    fn test_visibility_gate_overrides_score() {
        let composer = FeedbackComposer::default();
        let mut pose = all_visible(Some(0.9));
        for k in &PRIORITY_KEYPOINTS[..4] {
            pose.insert(*k, Landmark::new(0.5, 0.5, 0.0).with_visibility(0.45));
        }
        // 可視 5/9
        assert_eq!(composer.visible_keypoints(&pose).len(), 5);
        assert_eq!(composer.compose(0.99, &pose), REPOSITION);
    }

    #[test]
    fn test_missing_visibility_counts_as_visible() {
        let composer = FeedbackComposer::default();
        let pose = all_visible(None);
        assert_eq!(composer.visible_keypoints(&pose).len(), 9);
        assert_eq!(composer.compose(0.95, &pose), PERFECT_MATCH);
    }

    #[test]
    fn test_absent_keys_not_visible() {
        let composer = FeedbackComposer::default();
        let mut pose = all_visible(None);
        pose.remove(Keypoint::LeftWrist);
        pose.remove(Keypoint::RightWrist);
        pose.remove(Keypoint::Nose);
        assert_eq!(composer.compose(0.95, &pose), PERFECT_MATCH);
        pose.remove(Keypoint::LeftElbow);
        assert_eq!(composer.compose(0.95, &pose), REPOSITION);
    }

    #[test]
    fn test_never_empty() {
        let composer = FeedbackComposer::default();
        for score in [f32::NAN, -1.0, 0.0, 0.5, 1.0, 2.0] {
            assert!(!composer.compose(score, &all_visible(None)).is_empty());
            assert!(!composer.compose(score, &LandmarkMap::new()).is_empty());
        }
    }

    #[test]
    fn test_independent_thresholds() {
        let config = FeedbackConfig {
            try_pose: 0.1,
            getting_closer: 0.2,
            almost_there: 0.3,
            ..FeedbackConfig::default()
        };
        let composer = FeedbackComposer::from_config(&config).unwrap();
        assert_eq!(composer.compose(0.35, &all_visible(None)), PERFECT_MATCH);

        let bad = FeedbackConfig {
            try_pose: 0.5,
            getting_closer: 0.2,
            ..FeedbackConfig::default()
        };
        assert!(FeedbackComposer::from_config(&bad).is_err());
    }

    struct FixedAdvice(Result<String, AdviceError>);

    #[async_trait]
    impl AdviceService for FixedAdvice {
        async fn advise(&self, _request: &AdviceRequest) -> Result<String, AdviceError> {
            self.0.clone()
        }
    }

    struct SlowAdvice;

    #[async_trait]
    impl AdviceService for SlowAdvice {
        async fn advise(&self, _request: &AdviceRequest) -> Result<String, AdviceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_advice_used_when_available() {
        let composer = FeedbackComposer::default();
        let service = FixedAdvice(Ok("  Raise your left elbow a little \n".to_string()));
        let text = composer
            .compose_with_advice(&service, 0.6, EmotionState::Focused, &all_visible(None))
            .await;
        assert_eq!(text, "Raise your left elbow a little");
    }

    #[tokio::test]
    async fn test_advice_failure_falls_back() {
        let composer = FeedbackComposer::default();
        let failing = FixedAdvice(Err(AdviceError::Unavailable("offline".to_string())));
        let text = composer
            .compose_with_advice(&failing, 0.6, EmotionState::Focused, &all_visible(None))
            .await;
        assert_eq!(text, GETTING_CLOSER);

        let empty = FixedAdvice(Ok("   ".to_string()));
        let text = composer
            .compose_with_advice(&empty, 0.95, EmotionState::Celebrate, &all_visible(None))
            .await;
        assert_eq!(text, PERFECT_MATCH);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advice_timeout_falls_back() {
        let composer = FeedbackComposer::default();
        let text = composer
            .compose_with_advice(&SlowAdvice, 0.8, EmotionState::Happy, &all_visible(None))
            .await;
        assert_eq!(text, ALMOST_THERE);
    }

    #[tokio::test]
    async fn test_advice_skipped_when_out_of_view() {
        let composer = FeedbackComposer::default();
        let service = FixedAdvice(Ok("should not be used".to_string()));
        let text = composer
            .compose_with_advice(&service, 0.95, EmotionState::Celebrate, &LandmarkMap::new())
            .await;
        assert_eq!(text, REPOSITION);
    }
}
