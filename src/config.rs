use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub emotion: EmotionConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AcquisitionConfig {
    /// 処理フレームの最小間隔（ミリ秒）。これより早く来たフレームは捨てる
    #[serde(default = "default_min_frame_interval_ms")]
    pub min_frame_interval_ms: u64,
    /// EMA 係数 (0.0〜1.0)。大きいほど新しい観測を重視
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f32,
    /// FPS 平均に使うサンプル数 (1〜20 に丸める)
    #[serde(default = "default_fps_window")]
    pub fps_window: usize,
    /// スケジューラのティック間隔（ミリ秒）
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_min_frame_interval_ms() -> u64 { 16 }
fn default_smoothing_alpha() -> f32 { 0.5 }
fn default_fps_window() -> usize { 20 }
fn default_tick_interval_ms() -> u64 { 5 }

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            min_frame_interval_ms: default_min_frame_interval_ms(),
            smoothing_alpha: default_smoothing_alpha(),
            fps_window: default_fps_window(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl AcquisitionConfig {
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_millis(self.min_frame_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoreConfig {
    /// この可視度以下の点は重み 0
    #[serde(default = "default_visibility_floor")]
    pub visibility_floor: f32,
    /// この可視度以上の点は重み 1
    #[serde(default = "default_visibility_ceiling")]
    pub visibility_ceiling: f32,
    /// 正規化空間での距離スケール。平均距離がこれに達するとスコア 0
    #[serde(default = "default_distance_scale")]
    pub distance_scale: f32,
}

fn default_visibility_floor() -> f32 { 0.2 }
fn default_visibility_ceiling() -> f32 { 1.0 }
fn default_distance_scale() -> f32 { 1.25 }

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            visibility_floor: default_visibility_floor(),
            visibility_ceiling: default_visibility_ceiling(),
            distance_scale: default_distance_scale(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmotionConfig {
    #[serde(default = "default_tier_low")]
    pub confused: f32,
    #[serde(default = "default_tier_mid")]
    pub focused: f32,
    #[serde(default = "default_tier_high")]
    pub happy: f32,
}

fn default_tier_low() -> f32 { 0.4 }
fn default_tier_mid() -> f32 { 0.7 }
fn default_tier_high() -> f32 { 0.9 }

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            confused: default_tier_low(),
            focused: default_tier_mid(),
            happy: default_tier_high(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    #[serde(default = "default_tier_low")]
    pub try_pose: f32,
    #[serde(default = "default_tier_mid")]
    pub getting_closer: f32,
    #[serde(default = "default_tier_high")]
    pub almost_there: f32,
    /// この可視度を超えた点を「見えている」とみなす
    #[serde(default = "default_visibility_gate")]
    pub visibility_gate: f32,
    /// 見えている優先キーポイントがこれ未満なら位置調整を促す
    #[serde(default = "default_min_visible")]
    pub min_visible: usize,
    /// 外部アドバイスの待ち時間上限（ミリ秒）
    #[serde(default = "default_advice_timeout_ms")]
    pub advice_timeout_ms: u64,
}

fn default_visibility_gate() -> f32 { 0.45 }
fn default_min_visible() -> usize { 6 }
fn default_advice_timeout_ms() -> u64 { 800 }

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            try_pose: default_tier_low(),
            getting_closer: default_tier_mid(),
            almost_there: default_tier_high(),
            visibility_gate: default_visibility_gate(),
            min_visible: default_min_visible(),
            advice_timeout_ms: default_advice_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    /// ターゲット姿勢 (JSON, 0〜100 座標)
    #[serde(default = "default_target")]
    pub target: String,
    /// 記録済み検出結果 (JSON Lines)
    #[serde(default = "default_detections")]
    pub detections: String,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
}

fn default_target() -> String { "data/target.json".to_string() }
fn default_detections() -> String { "data/detections.jsonl".to_string() }
fn default_frame_width() -> u32 { 640 }
fn default_frame_height() -> u32 { 480 }

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            detections: default_detections(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    /// ONNX モデルのパス
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String { "models/movenet_lightning.onnx".to_string() }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// 読めなければデフォルト設定で続行
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }
}
