use ndarray::Array4;

use crate::camera::Frame;
use crate::error::DetectorError;

/// MoveNet用の入力サイズ
pub const MOVENET_INPUT_SIZE: usize = 192;

/// RGB8 フレームを MoveNet用の入力テンソルに変換
///
/// - 192x192 に最近傍リサイズ（アスペクト比は保持しない）
/// - [1, 192, 192, 3] の f32 テンソルに変換 (0.0-255.0)
pub fn preprocess_for_movenet(frame: &Frame) -> Result<Array4<f32>, DetectorError> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let expected = width * height * 3;
    if width == 0 || height == 0 || frame.pixels.len() < expected {
        return Err(DetectorError::InvalidFrame(format!(
            "{}x{} frame with {} bytes",
            frame.width,
            frame.height,
            frame.pixels.len()
        )));
    }

    let size = MOVENET_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for ty in 0..size {
        let sy = (ty * height / size).min(height - 1);
        for tx in 0..size {
            let sx = (tx * width / size).min(width - 1);
            let offset = (sy * width + sx) * 3;
            for c in 0..3 {
                tensor[[0, ty, tx, c]] = frame.pixels[offset + c] as f32;
            }
        }
    }

    Ok(tensor)
}
