//! NV12 plane extraction and stride-aware plane copies.
//!
//! Extraction is zero-copy: the returned frame borrows the source
//! buffer, so callers must finish their copy before the delivery
//! callback returns. The copy itself is the hot path — it runs once per
//! captured frame under a frame-period deadline, so equal strides take a
//! single bulk transfer and only mismatched strides degrade to per-row
//! copies.

use crate::error::MediaError;
use crate::sample::RawVideoSample;

/// A validated view of one NV12 frame: plane slices, strides, geometry.
///
/// Valid only while the backing [`RawVideoSample`] is; produced fresh
/// per call.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedVideoFrame<'a> {
    pub luma: &'a [u8],
    pub luma_stride: usize,
    pub chroma: &'a [u8],
    pub chroma_stride: usize,
    pub width: usize,
    pub height: usize,
}

/// Chroma plane height for 4:2:0 subsampling.
pub fn chroma_height(luma_height: usize) -> usize {
    luma_height / 2
}

/// Validate plane bounds and expose the frame's planes.
///
/// The last row of a plane need not be padded to the full stride, so the
/// bound is `stride * (rows - 1) + width`.
pub fn extract<'a>(sample: &RawVideoSample<'a>) -> Result<NormalizedVideoFrame<'a>, MediaError> {
    let luma_need = plane_min_len(sample.luma_stride, sample.width, sample.height);
    if sample.luma.len() < luma_need {
        return Err(MediaError::LumaPlaneTooSmall {
            need: luma_need,
            have: sample.luma.len(),
        });
    }
    let chroma_rows = chroma_height(sample.height);
    let chroma_need = plane_min_len(sample.chroma_stride, sample.width, chroma_rows);
    if sample.chroma.len() < chroma_need {
        return Err(MediaError::ChromaPlaneTooSmall {
            need: chroma_need,
            have: sample.chroma.len(),
        });
    }
    Ok(NormalizedVideoFrame {
        luma: sample.luma,
        luma_stride: sample.luma_stride,
        chroma: sample.chroma,
        chroma_stride: sample.chroma_stride,
        width: sample.width,
        height: sample.height,
    })
}

/// Copy `height` rows of `width` bytes between planes with independent
/// strides. Returns the number of transfers performed: 1 when the
/// strides match (one contiguous block), otherwise one per row.
pub fn copy_plane(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    width: usize,
    height: usize,
) -> usize {
    if height == 0 || width == 0 {
        return 0;
    }
    if src_stride == dst_stride {
        let len = (src_stride * height).min(src.len()).min(dst.len());
        dst[..len].copy_from_slice(&src[..len]);
        return 1;
    }
    for y in 0..height {
        let from = y * src_stride;
        let to = y * dst_stride;
        dst[to..to + width].copy_from_slice(&src[from..from + width]);
    }
    height
}

fn plane_min_len(stride: usize, width: usize, rows: usize) -> usize {
    if rows == 0 {
        return 0;
    }
    stride * (rows - 1) + width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::MediaTime;

    fn sample(width: usize, height: usize, stride: usize) -> (Vec<u8>, Vec<u8>) {
        let luma: Vec<u8> = (0..stride * height).map(|i| (i % 251) as u8).collect();
        let chroma: Vec<u8> = (0..stride * chroma_height(height))
            .map(|i| (i % 241) as u8)
            .collect();
        let _ = width;
        (luma, chroma)
    }

    #[test]
    fn equal_strides_take_one_transfer_per_plane() {
        let (luma, _) = sample(64, 8, 64);
        let mut dst = vec![0u8; 64 * 8];
        let transfers = copy_plane(&luma, 64, &mut dst, 64, 64, 8);
        assert_eq!(transfers, 1);
        assert_eq!(dst, luma);
    }

    #[test]
    fn mismatched_strides_take_one_transfer_per_row() {
        let (luma, _) = sample(60, 8, 64);
        let mut dst = vec![0u8; 96 * 8];
        let transfers = copy_plane(&luma, 64, &mut dst, 96, 60, 8);
        assert_eq!(transfers, 8);
        for y in 0..8 {
            assert_eq!(&dst[y * 96..y * 96 + 60], &luma[y * 64..y * 64 + 60]);
            // destination padding untouched
            assert!(dst[y * 96 + 60..(y + 1) * 96].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn copy_width_is_caller_bounded() {
        let (luma, _) = sample(32, 2, 40);
        let mut dst = vec![0u8; 16 * 2];
        // caller bounds width to min(src, dst) widths
        let transfers = copy_plane(&luma, 40, &mut dst, 16, 16, 2);
        assert_eq!(transfers, 2);
        assert_eq!(&dst[0..16], &luma[0..16]);
        assert_eq!(&dst[16..32], &luma[40..56]);
    }

    #[test]
    fn chroma_height_floors_odd_luma_heights() {
        assert_eq!(chroma_height(720), 360);
        assert_eq!(chroma_height(721), 360);
        assert_eq!(chroma_height(1), 0);
    }

    #[test]
    fn extract_exposes_planes_and_strides() {
        let (luma, chroma) = sample(60, 8, 64);
        let raw = RawVideoSample {
            width: 60,
            height: 8,
            luma: &luma,
            luma_stride: 64,
            chroma: &chroma,
            chroma_stride: 64,
            pts: MediaTime::new(0, 1),
        };
        let frame = extract(&raw).unwrap();
        assert_eq!(frame.width, 60);
        assert_eq!(frame.height, 8);
        assert_eq!(frame.luma_stride, 64);
        assert_eq!(frame.luma.len(), 64 * 8);
    }

    #[test]
    fn extract_rejects_short_planes() {
        let (luma, chroma) = sample(60, 8, 64);
        let raw = RawVideoSample {
            width: 60,
            height: 8,
            luma: &luma[..100],
            luma_stride: 64,
            chroma: &chroma,
            chroma_stride: 64,
            pts: MediaTime::new(0, 1),
        };
        assert!(matches!(
            extract(&raw),
            Err(MediaError::LumaPlaneTooSmall { .. })
        ));

        let raw = RawVideoSample {
            width: 60,
            height: 8,
            luma: &luma,
            luma_stride: 64,
            chroma: &chroma[..10],
            chroma_stride: 64,
            pts: MediaTime::new(0, 1),
        };
        assert!(matches!(
            extract(&raw),
            Err(MediaError::ChromaPlaneTooSmall { .. })
        ));
    }

    #[test]
    fn unpadded_last_row_is_accepted() {
        // stride 64 but the last row only carries `width` bytes
        let height = 4;
        let luma = vec![1u8; 64 * (height - 1) + 60];
        let chroma = vec![2u8; 64 * (height / 2 - 1) + 60];
        let raw = RawVideoSample {
            width: 60,
            height,
            luma: &luma,
            luma_stride: 64,
            chroma: &chroma,
            chroma_stride: 64,
            pts: MediaTime::new(0, 1),
        };
        assert!(extract(&raw).is_ok());
    }
}
