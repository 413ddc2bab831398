use std::collections::VecDeque;
use std::time::Duration;

/// 窓の最大サンプル数
pub const MAX_FPS_WINDOW: usize = 20;

/// 直近 N フレームの瞬間 FPS の移動平均 (N ≤ 20)
pub struct FpsMeter {
    capacity: usize,
    samples: VecDeque<f32>,
}

impl FpsMeter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_FPS_WINDOW);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// フレーム間隔を記録。0 の間隔は無視する
    pub fn record(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f32() * 1000.0;
        if ms <= 0.0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(1000.0 / ms);
    }

    /// サンプルが無ければ 0.0
    pub fn mean(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }
}
