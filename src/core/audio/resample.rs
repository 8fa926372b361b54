//! Sample-rate conversion between the 8 kHz telephony leg and the 16 kHz
//! agent leg.
//!
//! The 2:1 ratio keeps this simple: upsampling interpolates one midpoint
//! between neighbouring samples, downsampling averages sample pairs. Good
//! enough for speech; anything fancier belongs in a DSP crate, not here.

/// Upsample 8 kHz mono to 16 kHz mono by linear interpolation.
pub fn upsample_2x(samples: &[i16]) -> Vec<i16> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut output = Vec::with_capacity(samples.len() * 2);
    for (i, &sample) in samples.iter().enumerate() {
        output.push(sample);
        let next = samples.get(i + 1).copied().unwrap_or(sample);
        output.push(((sample as i32 + next as i32) / 2) as i16);
    }
    output
}

/// Downsample 16 kHz mono to 8 kHz mono by averaging sample pairs.
///
/// A trailing unpaired sample is dropped rather than padded.
pub fn downsample_2x(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsample_doubles_length() {
        let samples = vec![0i16, 100, -100, 32767];
        assert_eq!(upsample_2x(&samples).len(), 8);
    }

    #[test]
    fn upsample_interpolates_midpoints() {
        let out = upsample_2x(&[0, 100]);
        assert_eq!(out, vec![0, 50, 100, 100]);
    }

    #[test]
    fn downsample_halves_length() {
        let samples: Vec<i16> = (0..320).map(|i| i as i16).collect();
        assert_eq!(downsample_2x(&samples).len(), 160);
    }

    #[test]
    fn downsample_drops_trailing_odd_sample() {
        let out = downsample_2x(&[10, 20, 30]);
        assert_eq!(out, vec![15]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(upsample_2x(&[]).is_empty());
        assert!(downsample_2x(&[]).is_empty());
    }

    #[test]
    fn round_trip_preserves_length() {
        let samples: Vec<i16> = (0..160).map(|i| (i * 100) as i16).collect();
        let back = downsample_2x(&upsample_2x(&samples));
        assert_eq!(back.len(), samples.len());
    }
}
