use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use posemimic::camera::{Frame, LatestFrame};
use posemimic::coach::{Coach, FrameReport};
use posemimic::config::Config;
use posemimic::error::DetectorError;
use posemimic::pose::{PoseDetector, RawDetection, Skeleton};
use posemimic::tracker::AcquisitionLoop;

const CONFIG_PATH: &str = "config.toml";
const REPORT_CHANNEL: usize = 64;

/// 記録済みの検出結果を順に返す検出器
///
/// 記録を使い切ったら `finished` をキャンセルしてループを止める。
struct ReplayDetector {
    recording: VecDeque<RawDetection>,
    finished: CancellationToken,
}

#[async_trait]
impl PoseDetector for ReplayDetector {
    type Handle = VecDeque<RawDetection>;

    async fn acquire(&mut self) -> Result<Self::Handle, DetectorError> {
        if self.recording.is_empty() {
            return Err(DetectorError::Unavailable("recording is empty".to_string()));
        }
        Ok(std::mem::take(&mut self.recording))
    }

    async fn detect(
        &mut self,
        handle: &mut Self::Handle,
        _frame: &Frame,
        _timestamp: Duration,
    ) -> Result<Option<RawDetection>, DetectorError> {
        let next = handle.pop_front();
        if handle.is_empty() {
            self.finished.cancel();
        }
        Ok(next)
    }

    fn release(&mut self, handle: Self::Handle) {
        if !handle.is_empty() {
            info!("replay stopped with {} frames remaining", handle.len());
        }
    }
}

fn load_recording(path: &Path) -> Result<VecDeque<RawDetection>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read recording {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid detection", path.display(), i + 1))
        })
        .collect()
}

fn log_report(report: &FrameReport) {
    let sample = &report.sample;
    let a = &report.assessment;
    info!(
        frame = sample.index,
        t_ms = sample.timestamp.as_millis() as u64,
        fps = sample.fps,
        score = a.score,
        emotion = ?a.emotion,
        head_tilt = a.rig.head_tilt,
        lean = a.rig.body_lean,
        detect_failed = report.status.detect_failed,
        "{}",
        a.feedback
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("posemimic {}", env!("GIT_VERSION"));

    let config = Config::load_or_default(CONFIG_PATH);

    let target = match Skeleton::from_json_file(&config.replay.target) {
        Ok(skeleton) => Some(skeleton),
        Err(e) => {
            warn!("no target pose ({}), scoring disabled", e);
            None
        }
    };
    let coach = Coach::from_config(&config, target).context("invalid thresholds in config")?;

    let recording = load_recording(Path::new(&config.replay.detections))?;
    info!("replaying {} frames from {}", recording.len(), config.replay.detections);

    let cancel = CancellationToken::new();
    let detector = ReplayDetector {
        recording,
        finished: cancel.clone(),
    };
    let source = LatestFrame::with_frame(Frame::blank(
        config.replay.frame_width,
        config.replay.frame_height,
    ));
    let acquisition = AcquisitionLoop::new(detector, source, config.acquisition.clone());

    let (tx, mut rx) = mpsc::channel(REPORT_CHANNEL);
    let task = tokio::spawn(acquisition.run(coach, cancel.clone(), tx));

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.cancelled() => {}
            r = tokio::signal::ctrl_c() => {
                if r.is_ok() {
                    info!("interrupted");
                }
                interrupt.cancel();
            }
        }
    });

    let mut frames = 0u64;
    let mut best = 0.0f32;
    while let Some(report) = rx.recv().await {
        log_report(&report);
        frames += 1;
        best = best.max(report.assessment.score);
    }

    let status = task.await??;
    info!(
        "done: {} frames, best score {:.3}, final state {}",
        frames, best, status.state
    );
    Ok(())
}
