use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use super::detector::{PoseDetector, RawDetection, RawKeypoint, DETECTOR_KEYPOINTS};
use super::preprocess::preprocess_for_movenet;
use crate::camera::Frame;
use crate::config::DetectorConfig;
use crate::error::DetectorError;

/// 推論はブロッキングスレッドで行うため、セッションは共有して渡す
pub type SharedSession = Arc<Mutex<Session>>;

fn build_session(model_path: &Path) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// 入力: RGB8 フレーム
/// 出力: 17 キーポイント（元フレームのピクセル座標）
fn infer(session: &Mutex<Session>, frame: &Frame) -> Result<RawDetection, DetectorError> {
    let input = preprocess_for_movenet(frame)?;
    let input_tensor =
        Tensor::from_array(input).map_err(|e| DetectorError::Inference(e.to_string()))?;

    let mut session = session
        .lock()
        .map_err(|_| DetectorError::Inference("session lock poisoned".to_string()))?;
    let outputs = session
        .run(ort::inputs!["serving_default_input_0" => input_tensor])
        .map_err(|e| DetectorError::Inference(e.to_string()))?;

    // MoveNet の出力は [1, 1, 17, 3] (y, x, confidence)
    let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
        .try_extract_array()
        .map_err(|e| DetectorError::Inference(e.to_string()))?;

    let width = frame.width as f32;
    let height = frame.height as f32;
    let keypoints = (0..DETECTOR_KEYPOINTS.len())
        .map(|i| RawKeypoint {
            index: i,
            x: output[[0, 0, i, 1]] * width,
            y: output[[0, 0, i, 0]] * height,
            z: None,
            score: Some(output[[0, 0, i, 2]]),
        })
        .collect();

    Ok(RawDetection { keypoints })
}

/// MoveNet (ONNX) を使用した姿勢検出器
pub struct MoveNetDetector {
    model_path: PathBuf,
}

impl MoveNetDetector {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(&config.model)
    }
}

#[async_trait]
impl PoseDetector for MoveNetDetector {
    type Handle = SharedSession;

    async fn acquire(&mut self) -> Result<SharedSession, DetectorError> {
        let path = self.model_path.clone();
        // セッション構築は重いのでブロッキングスレッドで行う
        let session = tokio::task::spawn_blocking(move || build_session(&path))
            .await
            .map_err(|e| DetectorError::Unavailable(e.to_string()))?
            .map_err(|e| {
                DetectorError::Unavailable(format!(
                    "failed to load {}: {}",
                    self.model_path.display(),
                    e
                ))
            })?;
        info!(model = %self.model_path.display(), "MoveNet model loaded");
        Ok(Arc::new(Mutex::new(session)))
    }

    /// キャンセルされても推論スレッドは走り切り、結果は捨てられる
    async fn detect(
        &mut self,
        session: &mut SharedSession,
        frame: &Frame,
        _timestamp: Duration,
    ) -> Result<Option<RawDetection>, DetectorError> {
        let session = Arc::clone(session);
        let frame = frame.clone();
        let detection = tokio::task::spawn_blocking(move || infer(&session, &frame))
            .await
            .map_err(|e| DetectorError::Inference(e.to_string()))??;
        Ok(Some(detection))
    }

    fn release(&mut self, session: SharedSession) {
        drop(session);
        info!("MoveNet session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_model_unavailable() {
        let config = DetectorConfig {
            model: "models/does_not_exist.onnx".to_string(),
        };
        let mut detector = MoveNetDetector::from_config(&config);
        match detector.acquire().await {
            Err(DetectorError::Unavailable(message)) => {
                assert!(message.contains("does_not_exist.onnx"), "{}", message);
            }
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("missing model loaded"),
        }
    }
}
