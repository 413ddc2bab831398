use crate::pose::{Landmark, LandmarkMap};

/// EMAベースのランドマーク平滑化フィルタ
///
/// 検出から消えたキーは直前の生の値を保持する（平滑化はリセットせず止まる）。
/// 可視度は平滑化せず、保持している生の値をそのまま使う。
pub struct Smoother {
    alpha: f32,
    held: LandmarkMap,
    prev: Option<LandmarkMap>,
}

impl Smoother {
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { 1.0 };
        Self {
            alpha,
            held: LandmarkMap::new(),
            prev: None,
        }
    }

    /// 直近の平滑化結果
    pub fn last(&self) -> Option<&LandmarkMap> {
        self.prev.as_ref()
    }

    pub fn apply(&mut self, detection: &LandmarkMap) -> LandmarkMap {
        for (k, lm) in detection.iter() {
            self.held.insert(k, *lm);
        }

        let a = self.alpha;
        let smoothed = self.held.map(|k, current| {
            match self.prev.as_ref().and_then(|prev| prev.get(k)) {
                Some(prev) => Landmark {
                    x: prev.x * (1.0 - a) + current.x * a,
                    y: prev.y * (1.0 - a) + current.y * a,
                    z: prev.z * (1.0 - a) + current.z * a,
                    visibility: current.visibility,
                },
                // 初出のキーはそのまま通す
                None => *current,
            }
        });

        self.prev = Some(smoothed.clone());
        smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    fn single(k: Keypoint, x: f32, y: f32) -> LandmarkMap {
        [(k, Landmark::new(x, y, 0.0))].into_iter().collect()
    }

    #[test]
    fn test_first_frame_passthrough() {
        let mut s = Smoother::new(0.5);
        let frame = single(Keypoint::Nose, 0.3, 0.4);
        assert_eq!(s.apply(&frame), frame);
    }

    #[test]
    fn test_no_smoothing() {
        let mut s = Smoother::new(1.0);
        s.apply(&single(Keypoint::Nose, 0.0, 0.0));
        let result = s.apply(&single(Keypoint::Nose, 0.8, 0.6));
        let nose = result.get(Keypoint::Nose).unwrap();
        assert!(approx_eq_f32(nose.x, 0.8, 1e-6));
        assert!(approx_eq_f32(nose.y, 0.6, 1e-6));
    }

    #[test]
    fn test_position_smoothing() {
        let mut s = Smoother::new(0.5);
        s.apply(&single(Keypoint::Nose, 0.0, 0.0));
        let result = s.apply(&single(Keypoint::Nose, 0.4, 0.8));
        let nose = result.get(Keypoint::Nose).unwrap();
        assert!(approx_eq_f32(nose.x, 0.2, 1e-6));
        assert!(approx_eq_f32(nose.y, 0.4, 1e-6));
    }

    #[test]
    fn test_missing_key_holds_previous_raw() {
        let mut s = Smoother::new(0.5);
        let mut first = single(Keypoint::Nose, 0.5, 0.5);
        first.insert(Keypoint::LeftWrist, Landmark::new(0.2, 0.8, 0.0).with_visibility(0.9));
        s.apply(&first);

        // 手首が消えても前回の生の値で平滑化が続く
        let result = s.apply(&single(Keypoint::Nose, 0.7, 0.5));
        let wrist = result.get(Keypoint::LeftWrist).unwrap();
        assert!(approx_eq_f32(wrist.x, 0.2, 1e-6));
        assert!(approx_eq_f32(wrist.y, 0.8, 1e-6));
        assert_eq!(wrist.visibility, Some(0.9));
        assert!(approx_eq_f32(result.get(Keypoint::Nose).unwrap().x, 0.6, 1e-6));
    }

    #[test]
    fn test_converges_without_overshoot() {
        let mut s = Smoother::new(0.5);
        s.apply(&single(Keypoint::LeftHip, 0.0, 1.0));
        let target = single(Keypoint::LeftHip, 1.0, 0.0);

        let mut prev_x = 0.0;
        let mut prev_y = 1.0;
        for _ in 0..30 {
            let result = s.apply(&target);
            let hip = result.get(Keypoint::LeftHip).unwrap();
            assert!(hip.x >= prev_x && hip.x <= 1.0);
            assert!(hip.y <= prev_y && hip.y >= 0.0);
            prev_x = hip.x;
            prev_y = hip.y;
        }
        assert!(approx_eq_f32(prev_x, 1.0, 1e-4));
        assert!(approx_eq_f32(prev_y, 0.0, 1e-4));
    }
}
