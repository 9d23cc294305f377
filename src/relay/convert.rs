//! Depth-to-grayscale normalisation.

use crate::sensor::types::DEPTH_SAMPLE_MAX;

/// Map raw 11-bit depth samples to 8-bit grayscale via linear scaling.
///
/// `0` maps to `0`, `2047` maps to `255`, intermediate values truncate
/// (`1024` becomes `127`). Samples above the 11-bit range are sensor error
/// codes and clamp to `255` instead of wrapping into arbitrary gray levels.
pub fn depth_to_gray8(samples: &[u16]) -> Vec<u8> {
    samples
        .iter()
        .map(|&sample| {
            let clamped = u32::from(sample.min(DEPTH_SAMPLE_MAX));
            (clamped * 255 / u32::from(DEPTH_SAMPLE_MAX)) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_maps_to_black() {
        assert_eq!(depth_to_gray8(&[0]), vec![0]);
    }

    #[test]
    fn full_range_maps_to_white() {
        assert_eq!(depth_to_gray8(&[2047]), vec![255]);
    }

    #[test]
    fn midpoint_truncates() {
        // 1024 * 255 / 2047 = 127.56... truncated to 127
        assert_eq!(depth_to_gray8(&[1024]), vec![127]);
    }

    #[test]
    fn out_of_range_samples_clamp_to_white() {
        assert_eq!(depth_to_gray8(&[2048, 4095, u16::MAX]), vec![255, 255, 255]);
    }

    #[test]
    fn output_length_matches_input() {
        let samples = vec![512u16; 640 * 480];
        assert_eq!(depth_to_gray8(&samples).len(), 640 * 480);
    }

    #[test]
    fn conversion_is_deterministic() {
        let samples: Vec<u16> = (0..2048).collect();
        assert_eq!(depth_to_gray8(&samples), depth_to_gray8(&samples));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(depth_to_gray8(&[]).is_empty());
    }

    #[test]
    fn scale_is_monotonic() {
        let gray = depth_to_gray8(&[0, 256, 512, 1024, 1536, 2047]);
        for pair in gray.windows(2) {
            assert!(pair[0] <= pair[1], "scale must not invert: {gray:?}");
        }
    }
}
