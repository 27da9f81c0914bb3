//! Internal utility functions.
//!
//! Helpers for pixel-data copying and timestamp conversion shared by the
//! FFmpeg decoder.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// FFmpeg's internal time base (`AV_TIME_BASE`), in ticks per second.
pub(crate) const MICROSECONDS_PER_SECOND: i64 = 1_000_000;

/// Copy pixel data from an FFmpeg video frame into a tightly-packed RGB buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// The padding is stripped so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Convert a sample point to a container-level seek target in
/// `AV_TIME_BASE` units.
pub(crate) fn milliseconds_to_seek_timestamp(time_ms: u64) -> i64 {
    i64::try_from(time_ms)
        .unwrap_or(i64::MAX)
        .saturating_mul(MICROSECONDS_PER_SECOND / 1000)
}

/// Rescale a PTS value from a stream time base to milliseconds.
///
/// Integer arithmetic, truncating toward zero. Negative results (pre-roll
/// frames) are reported as 0.
pub(crate) fn pts_to_milliseconds(pts: i64, time_base: Rational) -> u64 {
    let denominator = i128::from(time_base.denominator());
    if denominator == 0 {
        return 0;
    }
    let milliseconds = i128::from(pts) * i128::from(time_base.numerator()) * 1000 / denominator;
    u64::try_from(milliseconds.max(0)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_targets_are_microseconds() {
        assert_eq!(milliseconds_to_seek_timestamp(0), 0);
        assert_eq!(milliseconds_to_seek_timestamp(32_500), 32_500_000);
        assert_eq!(milliseconds_to_seek_timestamp(u64::MAX), i64::MAX);
    }

    #[test]
    fn pts_rescales_through_time_base() {
        assert_eq!(pts_to_milliseconds(90_000, Rational::new(1, 90_000)), 1_000);
        assert_eq!(pts_to_milliseconds(25, Rational::new(1, 25)), 1_000);
        assert_eq!(pts_to_milliseconds(-3, Rational::new(1, 25)), 0);
        assert_eq!(pts_to_milliseconds(10, Rational::new(1, 0)), 0);
    }

    #[test]
    fn pts_rescaling_is_exact_for_large_values() {
        assert_eq!(pts_to_milliseconds(2_925_000, Rational::new(1, 90_000)), 32_500);
        assert_eq!(pts_to_milliseconds(2_924_999, Rational::new(1, 90_000)), 32_499);
        // Past 2^53, where a float rescale loses the last digit.
        assert_eq!(
            pts_to_milliseconds(9_007_199_254_740_993, Rational::new(1, 1000)),
            9_007_199_254_740_993
        );
        assert_eq!(pts_to_milliseconds(i64::MAX, Rational::new(i32::MAX, 1)), u64::MAX);
    }
}
