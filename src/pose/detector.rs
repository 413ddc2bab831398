use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::keypoint::{Keypoint, Landmark, LandmarkMap};
use crate::camera::Frame;
use crate::error::DetectorError;

/// 検出器出力インデックス → Keypoint の対応表 (MoveNet / COCO 順)
pub const DETECTOR_KEYPOINTS: [Keypoint; 17] = [
    Keypoint::Nose,
    Keypoint::LeftEye,
    Keypoint::RightEye,
    Keypoint::LeftEar,
    Keypoint::RightEar,
    Keypoint::LeftShoulder,
    Keypoint::RightShoulder,
    Keypoint::LeftElbow,
    Keypoint::RightElbow,
    Keypoint::LeftWrist,
    Keypoint::RightWrist,
    Keypoint::LeftHip,
    Keypoint::RightHip,
    Keypoint::LeftKnee,
    Keypoint::RightKnee,
    Keypoint::LeftAnkle,
    Keypoint::RightAnkle,
];

/// 検出器が返す 1 点（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawKeypoint {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: Option<f32>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// 1 フレーム分の検出結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub keypoints: Vec<RawKeypoint>,
}

impl RawDetection {
    /// 対応表で Keypoint 名に変換し、フレーム寸法で 0〜1 に正規化する
    ///
    /// 表にないインデックスや非有限値の点は捨てる。
    pub fn to_landmarks(&self, width: u32, height: u32) -> LandmarkMap {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        self.keypoints
            .iter()
            .filter(|kp| kp.x.is_finite() && kp.y.is_finite())
            .filter_map(|kp| {
                let keypoint = *DETECTOR_KEYPOINTS.get(kp.index)?;
                let mut landmark = Landmark::new(
                    kp.x / w,
                    kp.y / h,
                    kp.z.filter(|z| z.is_finite()).unwrap_or(0.0),
                );
                landmark.visibility = kp.score.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 1.0));
                Some((keypoint, landmark))
            })
            .collect()
    }
}

/// 姿勢検出ケイパビリティ
///
/// `acquire` と `release` は必ず対にすること。
#[async_trait]
pub trait PoseDetector: Send {
    type Handle: Send;

    /// モデル等を確保する。時間がかかってもスケジューラを塞がないこと
    async fn acquire(&mut self) -> Result<Self::Handle, DetectorError>;

    /// 1 フレームを推論する。人物がいなければ Ok(None)
    async fn detect(
        &mut self,
        handle: &mut Self::Handle,
        frame: &Frame,
        timestamp: Duration,
    ) -> Result<Option<RawDetection>, DetectorError>;

    fn release(&mut self, handle: Self::Handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_keypoint_order() {
        for (i, k) in DETECTOR_KEYPOINTS.iter().enumerate() {
            assert_eq!(*k as usize, i);
        }
    }

    #[test]
    fn test_remap_by_index() {
        let detection = RawDetection {
            keypoints: vec![
                RawKeypoint { index: 0, x: 320.0, y: 120.0, z: None, score: Some(0.9) },
                RawKeypoint { index: 10, x: 64.0, y: 48.0, z: Some(-0.2), score: None },
            ],
        };
        let map = detection.to_landmarks(640, 480);
        assert_eq!(map.len(), 2);

        let nose = map.get(Keypoint::Nose).unwrap();
        assert!((nose.x - 0.5).abs() < 1e-6);
        assert!((nose.y - 0.25).abs() < 1e-6);
        assert_eq!(nose.z, 0.0);
        assert_eq!(nose.visibility, Some(0.9));

        let wrist = map.get(Keypoint::RightWrist).unwrap();
        assert!((wrist.x - 0.1).abs() < 1e-6);
        assert_eq!(wrist.z, -0.2);
        assert!(wrist.visibility.is_none());
    }

    #[test]
    fn test_unknown_index_ignored() {
        let detection = RawDetection {
            keypoints: vec![
                RawKeypoint { index: 17, x: 1.0, y: 1.0, z: None, score: None },
                RawKeypoint { index: 3, x: f32::NAN, y: 1.0, z: None, score: None },
            ],
        };
        assert!(detection.to_landmarks(100, 100).is_empty());
    }

    #[test]
    fn test_score_clamped() {
        let detection = RawDetection {
            keypoints: vec![RawKeypoint { index: 5, x: 10.0, y: 10.0, z: None, score: Some(1.7) }],
        };
        let map = detection.to_landmarks(100, 100);
        assert_eq!(map.get(Keypoint::LeftShoulder).unwrap().visibility, Some(1.0));
    }
}
