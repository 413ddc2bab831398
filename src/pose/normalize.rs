use super::keypoint::{Keypoint, Landmark, LandmarkMap};

/// スケールの下限（体幹が潰れた場合のゼロ除算防止）
pub const MIN_SCALE: f32 = 1e-4;

const SHOULDER_WEIGHT: f32 = 0.5;
const HIP_WEIGHT: f32 = 0.2;
const TORSO_WEIGHT: f32 = 0.6;

/// 体幹 4 点（左右肩・左右腰）
const TORSO: [Keypoint; 4] = [
    Keypoint::LeftShoulder,
    Keypoint::RightShoulder,
    Keypoint::LeftHip,
    Keypoint::RightHip,
];

/// 姿勢の中心 (x, y)
///
/// 欠落した体幹点は (0, 0) として平均に含める。
/// 体幹が一部隠れていると中心が原点側に寄るが、この挙動は意図的に残している。
pub fn torso_center(map: &LandmarkMap) -> (f32, f32) {
    let (sx, sy) = TORSO.iter().fold((0.0, 0.0), |(ax, ay), &k| match map.get(k) {
        Some(lm) => (ax + lm.x, ay + lm.y),
        None => (ax, ay),
    });
    (sx / TORSO.len() as f32, sy / TORSO.len() as f32)
}

/// 体幹サイズ = 0.5*肩幅 + 0.2*腰幅 + 0.6*胴体高さ
///
/// 体幹 4 点のどれかが無ければ 1.0（正規化しない）
pub fn torso_scale(map: &LandmarkMap) -> f32 {
    let (Some(ls), Some(rs), Some(lh), Some(rh)) = (
        map.get(Keypoint::LeftShoulder),
        map.get(Keypoint::RightShoulder),
        map.get(Keypoint::LeftHip),
        map.get(Keypoint::RightHip),
    ) else {
        return 1.0;
    };

    let shoulder_width = ls.distance_2d(rs);
    let hip_width = lh.distance_2d(rh);
    let shoulder_mid = midpoint(ls, rs);
    let hip_mid = midpoint(lh, rh);
    let torso_height = shoulder_mid.distance_2d(&hip_mid);

    let scale = SHOULDER_WEIGHT * shoulder_width + HIP_WEIGHT * hip_width + TORSO_WEIGHT * torso_height;
    if scale.is_finite() {
        scale.max(MIN_SCALE)
    } else {
        1.0
    }
}

/// 体幹基準の並進・スケール不変な座標系へ変換
///
/// x, y は (p - center) / scale、z は scale で割るのみ。可視度はそのまま。
/// 出力のキーは入力のキーと同じ。
pub fn normalize(map: &LandmarkMap) -> LandmarkMap {
    let (cx, cy) = torso_center(map);
    let scale = torso_scale(map);
    map.map(|_, lm| Landmark {
        x: (lm.x - cx) / scale,
        y: (lm.y - cy) / scale,
        z: lm.z / scale,
        visibility: lm.visibility,
    })
}

pub(crate) fn midpoint(a: &Landmark, b: &Landmark) -> Landmark {
    Landmark::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0, (a.z + b.z) / 2.0)
}
