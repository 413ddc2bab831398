use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SkeletonError;

/// COCO/MoveNet 順の 17 キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum Keypoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Keypoint {
    pub const COUNT: usize = 17;

    pub const ALL: [Keypoint; Keypoint::COUNT] = [
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

    pub fn name(self) -> &'static str {
        match self {
            Keypoint::Nose => "nose",
            Keypoint::LeftEye => "leftEye",
            Keypoint::RightEye => "rightEye",
            Keypoint::LeftEar => "leftEar",
            Keypoint::RightEar => "rightEar",
            Keypoint::LeftShoulder => "leftShoulder",
            Keypoint::RightShoulder => "rightShoulder",
            Keypoint::LeftElbow => "leftElbow",
            Keypoint::RightElbow => "rightElbow",
            Keypoint::LeftWrist => "leftWrist",
            Keypoint::RightWrist => "rightWrist",
            Keypoint::LeftHip => "leftHip",
            Keypoint::RightHip => "rightHip",
            Keypoint::LeftKnee => "leftKnee",
            Keypoint::RightKnee => "rightKnee",
            Keypoint::LeftAnkle => "leftAnkle",
            Keypoint::RightAnkle => "rightAnkle",
        }
    }
}

impl fmt::Display for Keypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// スコアリング・可視判定に使う 9 キーポイント（目・耳・膝・足首は除外）
pub const PRIORITY_KEYPOINTS: [Keypoint; 9] = [
    Keypoint::Nose,
    Keypoint::LeftShoulder,
    Keypoint::RightShoulder,
    Keypoint::LeftElbow,
    Keypoint::RightElbow,
    Keypoint::LeftWrist,
    Keypoint::RightWrist,
    Keypoint::LeftHip,
    Keypoint::RightHip,
];

/// 1 フレーム分の観測位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// フレーム幅に対する X (0.0〜1.0)
    pub x: f32,
    /// フレーム高さに対する Y (0.0〜1.0、下が正)
    pub y: f32,
    /// 奥行きのヒント
    #[serde(default)]
    pub z: f32,
    /// 可視度 (0.0〜1.0)。None は可視扱い
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// 可視度。未設定なら 1.0
    pub fn visibility_or_default(&self) -> f32 {
        self.visibility.map_or(1.0, |v| v.clamp(0.0, 1.0))
    }

    /// XY 平面上の距離
    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Keypoint → Landmark の部分写像（遮蔽されたキーは欠落する）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkMap {
    slots: [Option<Landmark>; Keypoint::COUNT],
}

impl LandmarkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, keypoint: Keypoint) -> Option<&Landmark> {
        self.slots[keypoint as usize].as_ref()
    }

    pub fn contains(&self, keypoint: Keypoint) -> bool {
        self.slots[keypoint as usize].is_some()
    }

    pub fn insert(&mut self, keypoint: Keypoint, landmark: Landmark) -> Option<Landmark> {
        self.slots[keypoint as usize].replace(landmark)
    }

    pub fn remove(&mut self, keypoint: Keypoint) -> Option<Landmark> {
        self.slots[keypoint as usize].take()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Keypoint, &Landmark)> + '_ {
        Keypoint::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(&k, slot)| slot.as_ref().map(|lm| (k, lm)))
    }

    /// 存在するキーにだけ `f` を適用した新しいマップ
    pub fn map<F>(&self, mut f: F) -> LandmarkMap
    where
        F: FnMut(Keypoint, &Landmark) -> Landmark,
    {
        let mut out = LandmarkMap::new();
        for (k, lm) in self.iter() {
            out.insert(k, f(k, lm));
        }
        out
    }
}

impl FromIterator<(Keypoint, Landmark)> for LandmarkMap {
    fn from_iter<I: IntoIterator<Item = (Keypoint, Landmark)>>(iter: I) -> Self {
        let mut map = LandmarkMap::new();
        for (k, lm) in iter {
            map.insert(k, lm);
        }
        map
    }
}

/// ターゲット姿勢の 1 点 (0〜100 座標系)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl SkeletonPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// 17 キーすべてを持つターゲット姿勢（0〜100 座標系）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "HashMap<Keypoint, SkeletonPoint>",
    into = "HashMap<Keypoint, SkeletonPoint>"
)]
pub struct Skeleton {
    points: [SkeletonPoint; Keypoint::COUNT],
}

impl Skeleton {
    /// 座標系の上限。0〜1 への変換に使う
    pub const EXTENT: f32 = 100.0;

    pub fn new(points: [SkeletonPoint; Keypoint::COUNT]) -> Self {
        Self { points }
    }

    pub fn get(&self, keypoint: Keypoint) -> &SkeletonPoint {
        &self.points[keypoint as usize]
    }

    /// 0〜1 の LandmarkMap に変換（可視度なし＝可視扱い）
    pub fn to_landmarks(&self) -> LandmarkMap {
        Keypoint::ALL
            .iter()
            .map(|&k| {
                let p = self.get(k);
                (
                    k,
                    Landmark::new(p.x / Self::EXTENT, p.y / Self::EXTENT, p.z / Self::EXTENT),
                )
            })
            .collect()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SkeletonError> {
        let content = fs::read_to_string(path)?;
        let skeleton = serde_json::from_str(&content)?;
        Ok(skeleton)
    }
}

impl TryFrom<HashMap<Keypoint, SkeletonPoint>> for Skeleton {
    type Error = SkeletonError;

    fn try_from(map: HashMap<Keypoint, SkeletonPoint>) -> Result<Self, Self::Error> {
        let mut points = [SkeletonPoint::default(); Keypoint::COUNT];
        for k in Keypoint::ALL {
            points[k as usize] = *map.get(&k).ok_or(SkeletonError::MissingKeypoint(k))?;
        }
        Ok(Self { points })
    }
}

impl From<Skeleton> for HashMap<Keypoint, SkeletonPoint> {
    fn from(skeleton: Skeleton) -> Self {
        Keypoint::ALL
            .iter()
            .map(|&k| (k, skeleton.points[k as usize]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_count() {
        assert_eq!(Keypoint::COUNT, 17);
        assert_eq!(Keypoint::ALL.len(), Keypoint::COUNT);
        for (i, k) in Keypoint::ALL.iter().enumerate() {
            assert_eq!(*k as usize, i);
        }
    }

    #[test]
    fn test_keypoint_serde_name() {
        let json = serde_json::to_string(&Keypoint::LeftShoulder).unwrap();
        assert_eq!(json, "\"leftShoulder\"");
        assert_eq!(Keypoint::RightAnkle.to_string(), "rightAnkle");
    }

    #[test]
    fn test_visibility_default() {
        let lm = Landmark::new(0.5, 0.5, 0.0);
        assert_eq!(lm.visibility_or_default(), 1.0);
        assert_eq!(lm.with_visibility(0.3).visibility_or_default(), 0.3);
    }

    #[test]
    fn test_landmark_map_partial() {
        let mut map = LandmarkMap::new();
        assert!(map.is_empty());
        map.insert(Keypoint::Nose, Landmark::new(0.5, 0.2, 0.0));
        map.insert(Keypoint::LeftHip, Landmark::new(0.4, 0.6, 0.0));
        assert_eq!(map.len(), 2);
        assert!(map.contains(Keypoint::Nose));
        assert!(!map.contains(Keypoint::RightHip));

        let keys: Vec<Keypoint> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Keypoint::Nose, Keypoint::LeftHip]);

        map.remove(Keypoint::Nose);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_skeleton_to_landmarks() {
        let mut points = [SkeletonPoint::default(); Keypoint::COUNT];
        points[Keypoint::Nose as usize] = SkeletonPoint::new(50.0, 20.0);
        let skeleton = Skeleton::new(points);
        let map = skeleton.to_landmarks();
        assert_eq!(map.len(), Keypoint::COUNT);
        let nose = map.get(Keypoint::Nose).unwrap();
        assert!((nose.x - 0.5).abs() < 1e-6);
        assert!((nose.y - 0.2).abs() < 1e-6);
        assert!(nose.visibility.is_none());
    }

    #[test]
    fn test_skeleton_json_complete() {
        let entries: Vec<String> = Keypoint::ALL
            .iter()
            .map(|k| format!("\"{}\": {{\"x\": 10, \"y\": 20}}", k))
            .collect();
        let json = format!("{{{}}}", entries.join(","));
        let skeleton: Skeleton = serde_json::from_str(&json).unwrap();
        assert_eq!(skeleton.get(Keypoint::RightWrist).y, 20.0);
    }

    #[test]
    fn test_skeleton_json_incomplete() {
        let json = r#"{"nose": {"x": 50, "y": 10}}"#;
        let result: Result<Skeleton, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
