use image::{imageops, RgbaImage};
use thiserror::Error;

use crate::ingest::raw_frame::{RawFrame, BYTES_PER_PIXEL};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("frame buffer holds {actual} bytes, need {expected} for {width}x{height} RGBA")]
    BufferTooSmall {
        expected: usize,
        actual: usize,
        width: u32,
        height: u32,
    },
    #[error("unsupported rotation: {0} degrees (expected 0, 90, 180 or 270)")]
    UnsupportedRotation(u32),
}

/// Turn a raw camera frame into a canonical upright [`Frame`].
///
/// The buffer is reinterpreted directly as packed RGBA — no color-space
/// conversion happens here, so the camera must already deliver the
/// destination pixel format. Surplus bytes past `width * height * 4`
/// (row padding) are ignored. Rotations of 90 and 270 degrees swap the
/// reported dimensions.
pub fn convert(raw: RawFrame) -> Result<Frame, ConvertError> {
    let (mut data, width, height, rotation) = raw.into_parts();

    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if data.len() < expected {
        return Err(ConvertError::BufferTooSmall {
            expected,
            actual: data.len(),
            width,
            height,
        });
    }
    data.truncate(expected);

    let upright = match rotation {
        0 => {
            return Ok(Frame::new(data, width, height, BYTES_PER_PIXEL as u8));
        }
        90 | 180 | 270 => {
            let image = RgbaImage::from_raw(width, height, data)
                .expect("buffer length checked above");
            match rotation {
                90 => imageops::rotate90(&image),
                180 => imageops::rotate180(&image),
                _ => imageops::rotate270(&image),
            }
        }
        other => return Err(ConvertError::UnsupportedRotation(other)),
    };

    let (w, h) = (upright.width(), upright.height());
    Ok(Frame::new(upright.into_raw(), w, h, BYTES_PER_PIXEL as u8))
}
