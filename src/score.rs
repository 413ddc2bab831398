use crate::config::ScoreConfig;
use crate::pose::{normalize, LandmarkMap, Skeleton, PRIORITY_KEYPOINTS};

/// 現在の姿勢とターゲット姿勢の一致度 (0.0〜1.0)
///
/// 体幹基準で正規化した空間で優先 9 点の距離を測り、
/// 現在側の生の可視度で重み付けした平均距離からスコアを作る。
#[derive(Debug, Clone)]
pub struct Scorer {
    visibility_floor: f32,
    visibility_ceiling: f32,
    distance_scale: f32,
}

impl Scorer {
    pub fn new(visibility_floor: f32, visibility_ceiling: f32, distance_scale: f32) -> Self {
        Self {
            visibility_floor,
            visibility_ceiling,
            distance_scale,
        }
    }

    pub fn from_config(config: &ScoreConfig) -> Self {
        Self::new(
            config.visibility_floor,
            config.visibility_ceiling,
            config.distance_scale,
        )
    }

    /// 可視度 → 重み。floor 以下は 0、ceiling 以上は 1、その間は線形
    pub fn visibility_weight(&self, visibility: f32) -> f32 {
        let span = self.visibility_ceiling - self.visibility_floor;
        if span <= f32::EPSILON {
            return if visibility >= self.visibility_ceiling { 1.0 } else { 0.0 };
        }
        let w = (visibility - self.visibility_floor) / span;
        if w.is_finite() {
            w.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// ターゲットが無い、または重み合計が 0 なら 0.0
    pub fn score(&self, current: &LandmarkMap, target: Option<&Skeleton>) -> f32 {
        let Some(target) = target else {
            return 0.0;
        };
        let target = normalize(&target.to_landmarks());
        let normalized = normalize(current);

        let mut weighted_distance = 0.0f32;
        let mut total_weight = 0.0f32;
        for k in PRIORITY_KEYPOINTS {
            let (Some(raw), Some(cur), Some(tgt)) =
                (current.get(k), normalized.get(k), target.get(k))
            else {
                continue;
            };
            let weight = self.visibility_weight(raw.visibility_or_default());
            let distance = cur.distance_2d(tgt);
            if weight <= 0.0 || !distance.is_finite() {
                continue;
            }
            weighted_distance += weight * distance;
            total_weight += weight;
        }

        if total_weight <= 0.0 {
            return 0.0;
        }
        let mean = weighted_distance / total_weight;
        let score = 1.0 - mean / self.distance_scale.max(f32::EPSILON);
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::from_config(&ScoreConfig::default())
    }
}
