use serde::Serialize;

use crate::pose::normalize::midpoint;
use crate::pose::{normalize, Keypoint, Landmark, LandmarkMap};

const HEAD_NOSE_GAIN: f32 = 1.5;
const HEAD_SLOPE_GAIN: f32 = 2.0;
const ARM_UPPER_GAIN: f32 = 1.2;
const ARM_LOWER_GAIN: f32 = 0.8;
const LEAN_GAIN: f32 = 2.0;
const BALANCE_GAIN: f32 = 2.0;

/// アバター駆動用の制御値（各 -1.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RigSignals {
    pub head_tilt: f32,
    pub left_arm_lift: f32,
    pub right_arm_lift: f32,
    pub body_lean: f32,
    pub balance_shift: f32,
}

fn clamp_signal(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// 正規化済みの姿勢から制御値を計算
///
/// 画像座標は下が正。必要な点が欠けた項は 0 として扱う。
pub fn map_rig(landmarks: &LandmarkMap) -> RigSignals {
    let n = normalize(landmarks);
    let get = |k: Keypoint| n.get(k);

    let ls = get(Keypoint::LeftShoulder);
    let rs = get(Keypoint::RightShoulder);
    let lh = get(Keypoint::LeftHip);
    let rh = get(Keypoint::RightHip);

    // 頭: 鼻の横ずれ + 肩の傾き
    let nose_term = get(Keypoint::Nose).map_or(0.0, |nose| HEAD_NOSE_GAIN * nose.x);
    let slope_term = match (ls, rs) {
        (Some(l), Some(r)) => HEAD_SLOPE_GAIN * (r.y - l.y),
        _ => 0.0,
    };

    let left_arm_lift = arm_lift(ls, get(Keypoint::LeftElbow), get(Keypoint::LeftWrist));
    let right_arm_lift = arm_lift(rs, get(Keypoint::RightElbow), get(Keypoint::RightWrist));

    let shoulder_mid = match (ls, rs) {
        (Some(l), Some(r)) => Some(midpoint(l, r)),
        _ => None,
    };
    let hip_mid = match (lh, rh) {
        (Some(l), Some(r)) => Some(midpoint(l, r)),
        _ => None,
    };

    // 体の傾き: 肩幅の符号で向きを決め、肩中点と腰中点の横ずれを大きさにする
    let facing = match (ls, rs) {
        (Some(l), Some(r)) if (l.x - r.x).abs() > f32::EPSILON => (l.x - r.x).signum(),
        _ => 0.0,
    };
    let body_lean = match (shoulder_mid, hip_mid) {
        (Some(s), Some(h)) => facing * LEAN_GAIN * (s.x - h.x),
        _ => 0.0,
    };

    let balance_shift = hip_mid.map_or(0.0, |h| BALANCE_GAIN * h.x);

    RigSignals {
        head_tilt: clamp_signal(nose_term + slope_term),
        left_arm_lift: clamp_signal(left_arm_lift),
        right_arm_lift: clamp_signal(right_arm_lift),
        body_lean: clamp_signal(body_lean),
        balance_shift: clamp_signal(balance_shift),
    }
}

/// 肩 → 肘 → 手首 の上下関係。上がっているほど正
fn arm_lift(shoulder: Option<&Landmark>, elbow: Option<&Landmark>, wrist: Option<&Landmark>) -> f32 {
    let upper = match (shoulder, elbow) {
        (Some(s), Some(e)) => ARM_UPPER_GAIN * (s.y - e.y),
        _ => 0.0,
    };
    let lower = match (elbow, wrist) {
        (Some(e), Some(w)) => ARM_LOWER_GAIN * (e.y - w.y),
        _ => 0.0,
    };
    upper + lower
}
