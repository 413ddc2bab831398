//! Realtime acquisition loop: detector lifecycle, frame throttling, smoothing.
//!
//! One loop owns one detector handle and one [`Session`]. Frames are processed
//! strictly one at a time; a frame that arrives before the minimum spacing has
//! elapsed is dropped, never queued.

use std::fmt;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::session::{FrameSample, Session};
use crate::camera::FrameSource;
use crate::coach::{Coach, FrameReport};
use crate::config::AcquisitionConfig;
use crate::error::{AcquisitionError, DetectorError};
use crate::pose::PoseDetector;

#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Idle,
    Initializing,
    Running,
    /// Terminal. Carries the reason when the loop stopped on an error.
    Stopped { error: Option<String> },
}

impl LoopState {
    fn name(&self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Initializing => "initializing",
            LoopState::Running => "running",
            LoopState::Stopped { .. } => "stopped",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Readiness and error status exposed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStatus {
    pub state: LoopState,
    /// Set when the most recent detector call failed; cleared by the next success.
    pub detect_failed: bool,
    pub last_error: Option<String>,
}

impl LoopStatus {
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }
}

impl Default for LoopStatus {
    fn default() -> Self {
        Self {
            state: LoopState::Idle,
            detect_failed: false,
            last_error: None,
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    /// The loop is not running; nothing was done.
    Inactive,
    /// No decodable frame yet.
    NotReady,
    /// Too soon after the previous detection.
    Dropped,
    Processed(FrameSample),
    DetectFailed(DetectorError),
}

pub struct AcquisitionLoop<D: PoseDetector, S: FrameSource> {
    detector: D,
    source: S,
    config: AcquisitionConfig,
    handle: Option<D::Handle>,
    session: Option<Session>,
    last_attempt: Option<Instant>,
    status: LoopStatus,
}

impl<D: PoseDetector, S: FrameSource> AcquisitionLoop<D, S> {
    pub fn new(detector: D, source: S, config: AcquisitionConfig) -> Self {
        Self {
            detector,
            source,
            config,
            handle: None,
            session: None,
            last_attempt: None,
            status: LoopStatus::default(),
        }
    }

    pub fn status(&self) -> &LoopStatus {
        &self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Acquire the detector. Idle → Initializing → Running, or Stopped on failure.
    pub async fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.status.state != LoopState::Idle {
            return Err(AcquisitionError::InvalidState(self.status.state.name(), "idle"));
        }
        self.status.state = LoopState::Initializing;
        info!("acquiring pose detector");

        match self.detector.acquire().await {
            Ok(handle) => {
                self.handle = Some(handle);
                // tick と同じ時計で計る
                let now = tokio::time::Instant::now().into_std();
                self.session = Some(Session::new(now, &self.config));
                self.status.state = LoopState::Running;
                info!("acquisition loop running");
                Ok(())
            }
            Err(e) => {
                warn!("pose detector unavailable: {}", e);
                let message = e.to_string();
                self.status.state = LoopState::Stopped {
                    error: Some(message.clone()),
                };
                self.status.last_error = Some(message);
                Err(AcquisitionError::CapabilityUnavailable(e))
            }
        }
    }

    /// Process at most one frame.
    ///
    /// Session state is only touched after the detector resolves, so dropping
    /// this future mid-detection leaves the session as it was.
    pub async fn tick_at(&mut self, now: Instant) -> TickOutcome {
        if self.status.state != LoopState::Running {
            return TickOutcome::Inactive;
        }
        let Some(frame) = self.source.current_frame() else {
            return TickOutcome::NotReady;
        };
        if let Some(last) = self.last_attempt {
            if now.saturating_duration_since(last) < self.config.min_frame_interval() {
                trace!("frame dropped");
                return TickOutcome::Dropped;
            }
        }
        let (Some(handle), Some(session)) = (self.handle.as_mut(), self.session.as_ref()) else {
            return TickOutcome::Inactive;
        };
        let timestamp = session.elapsed(now);

        let result = self.detector.detect(handle, &frame, timestamp).await;
        self.last_attempt = Some(now);

        match result {
            Ok(detection) => {
                let landmarks = detection.map(|d| d.to_landmarks(frame.width, frame.height));
                let Some(session) = self.session.as_mut() else {
                    return TickOutcome::Inactive;
                };
                let sample = session.commit(now, landmarks.as_ref());
                self.status.detect_failed = false;
                self.status.last_error = None;
                TickOutcome::Processed(sample)
            }
            Err(e) => {
                warn!("detection failed: {}", e);
                self.status.detect_failed = true;
                self.status.last_error = Some(e.to_string());
                TickOutcome::DetectFailed(e)
            }
        }
    }

    /// Release the detector and discard the session. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.detector.release(handle);
            info!("pose detector released");
        }
        self.session = None;
        if !matches!(self.status.state, LoopState::Stopped { .. }) {
            self.status.state = LoopState::Stopped { error: None };
        }
    }

    /// Drive the loop until cancelled or the report receiver goes away.
    ///
    /// Every processed frame is assessed by `coach` and sent to `sink`. A failed
    /// detection sends the last good sample again with `detect_failed` set. The
    /// detector is released before this returns, on every path.
    pub async fn run(
        mut self,
        coach: Coach,
        cancel: CancellationToken,
        sink: mpsc::Sender<FrameReport>,
    ) -> Result<LoopStatus, AcquisitionError> {
        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            r = self.start() => Some(r),
        };
        match started {
            None => {
                self.stop();
                return Ok(self.status.clone());
            }
            Some(Err(e)) => {
                self.stop();
                return Err(e);
            }
            Some(Ok(())) => {}
        }

        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let ticked = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = ticker.tick() => true,
            };
            if !ticked {
                break;
            }

            let now = tokio::time::Instant::now().into_std();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                o = self.tick_at(now) => Some(o),
            };
            let Some(outcome) = outcome else {
                debug!("cancelled during detection");
                break;
            };

            let sample = match outcome {
                TickOutcome::Processed(sample) => sample,
                TickOutcome::DetectFailed(_) => match self.session.as_ref() {
                    Some(session) => session.held_sample(now),
                    None => break,
                },
                _ => continue,
            };
            let report = coach.report(sample, self.status.clone());

            // 受信側が詰まっていてもキャンセルは効かせる
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = sink.send(report) => Some(r.is_ok()),
            };
            match sent {
                None => {
                    debug!("cancelled while sending report");
                    break;
                }
                Some(false) => {
                    debug!("report receiver closed");
                    break;
                }
                Some(true) => {}
            }
        }

        self.stop();
        Ok(self.status.clone())
    }
}

impl<D: PoseDetector, S: FrameSource> Drop for AcquisitionLoop<D, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.detector.release(handle);
        }
    }
}
