use std::time::{Duration, Instant};

use super::fps::FpsMeter;
use super::smooth::Smoother;
use crate::config::AcquisitionConfig;
use crate::pose::LandmarkMap;

/// 処理済み 1 フレーム分の出力
#[derive(Debug, Clone)]
pub struct FrameSample {
    /// セッション内の通し番号 (0 始まり)
    pub index: u64,
    /// セッション開始からの経過時間
    pub timestamp: Duration,
    pub smoothed: LandmarkMap,
    /// 直近ウィンドウの平均 FPS
    pub fps: f32,
}

/// トラッキング 1 回分の平滑化・FPS 状態
///
/// 開始時に作られ、処理フレームごとに 1 回だけ更新され、停止時に捨てられる。
pub struct Session {
    started_at: Instant,
    last_processed: Option<Instant>,
    smoother: Smoother,
    fps: FpsMeter,
    frames: u64,
    last_sample: Option<FrameSample>,
}

impl Session {
    pub fn new(started_at: Instant, config: &AcquisitionConfig) -> Self {
        Self {
            started_at,
            last_processed: None,
            smoother: Smoother::new(config.smoothing_alpha),
            fps: FpsMeter::new(config.fps_window),
            frames: 0,
            last_sample: None,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn smoothed(&self) -> Option<&LandmarkMap> {
        self.smoother.last()
    }

    pub fn mean_fps(&self) -> f32 {
        self.fps.mean()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 検出結果を取り込む。None（人物なし）は保持中の値で平滑化を進める
    pub fn commit(&mut self, now: Instant, detection: Option<&LandmarkMap>) -> FrameSample {
        if let Some(last) = self.last_processed {
            self.fps.record(now.saturating_duration_since(last));
        }
        self.last_processed = Some(now);

        let empty = LandmarkMap::new();
        let smoothed = self.smoother.apply(detection.unwrap_or(&empty));

        let sample = FrameSample {
            index: self.frames,
            timestamp: self.elapsed(now),
            smoothed,
            fps: self.fps.mean(),
        };
        self.frames += 1;
        self.last_sample = Some(sample.clone());
        sample
    }

    /// 状態を進めずに直近の処理結果を返す。まだ無ければ空のサンプル
    pub fn held_sample(&self, now: Instant) -> FrameSample {
        match &self.last_sample {
            Some(sample) => sample.clone(),
            None => FrameSample {
                index: 0,
                timestamp: self.elapsed(now),
                smoothed: LandmarkMap::new(),
                fps: 0.0,
            },
        }
    }
}
