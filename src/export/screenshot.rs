use crate::engine::CapturedFrame;
use crate::resources::encode_rgba_png;

use super::{ExportError, ExportedFile, Payload};

pub const SCREENSHOT_FILE_NAME: &str = "screenshot.png";

/// Encode a captured frame as `screenshot.png`.
pub fn screenshot_png(frame: &CapturedFrame) -> Result<ExportedFile, ExportError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.width == 0 || frame.height == 0 || frame.pixels.len() != expected {
        return Err(ExportError::InvalidCapture(format!(
            "{}x{} frame with {} bytes",
            frame.width,
            frame.height,
            frame.pixels.len()
        )));
    }

    let png = encode_rgba_png(frame.width, frame.height, &frame.pixels)?;
    Ok(ExportedFile {
        file_name: SCREENSHOT_FILE_NAME.to_string(),
        payload: Payload::Binary(png),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_is_png() {
        let frame = CapturedFrame {
            width: 2,
            height: 2,
            pixels: vec![128; 16],
        };
        let file = screenshot_png(&frame).unwrap();
        assert_eq!(file.file_name, "screenshot.png");

        let decoded = image::load_from_memory(file.payload.as_bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }

    #[test]
    fn test_mismatched_capture() {
        let frame = CapturedFrame {
            width: 4,
            height: 4,
            pixels: vec![0; 3],
        };
        assert!(matches!(
            screenshot_png(&frame),
            Err(ExportError::InvalidCapture(_))
        ));
    }
}
