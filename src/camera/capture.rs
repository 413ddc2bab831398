use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

/// RGB8 フレーム
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 元画像の幅（ピクセル）
    pub width: u32,
    /// 元画像の高さ（ピクセル）
    pub height: u32,
    /// 行優先の RGB8 画素列 (width * height * 3)
    pub pixels: Bytes,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Bytes) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// 黒一色のフレーム
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self::new(width, height, Bytes::from(vec![0u8; len]))
    }

    /// 寸法が確定していてデコード可能か
    pub fn is_decodable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// 読み取り専用の映像ソース
pub trait FrameSource: Send + Sync {
    /// 現在のフレーム。まだ準備できていなければ None
    fn current_frame(&self) -> Option<Frame>;
}

/// 最新フレームだけを保持する共有スロット
///
/// キャプチャ側が `publish` で上書きし、ループ側は常に最新を読む。
/// 古いフレームはキューされずに捨てられる。
#[derive(Clone, Default)]
pub struct LatestFrame {
    latest: Arc<Mutex<Option<Frame>>>,
    frame_id: Arc<AtomicU64>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(frame: Frame) -> Self {
        let slot = Self::new();
        slot.publish(frame);
        slot
    }

    /// 新しいフレームで上書き
    pub fn publish(&self, frame: Frame) {
        let mut guard = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(frame);
        self.frame_id.fetch_add(1, Ordering::Release);
    }

    /// 現在のフレームIDを取得。新フレームが到着するたびにインクリメントされる。
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }
}

impl FrameSource for LatestFrame {
    fn current_frame(&self) -> Option<Frame> {
        let guard = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().filter(|f| f.is_decodable()).cloned()
    }
}
