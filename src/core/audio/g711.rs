//! G.711 μ-law companding.
//!
//! The telephony leg carries 8 kHz mono μ-law (PCMU). These routines convert
//! between companded bytes and 16-bit linear samples. G.711 is stateless, so
//! both directions are plain per-sample functions.

/// Bias added before segment search, per G.711.
const BIAS: i32 = 0x84;
/// Linear magnitude ceiling before companding.
const CLIP: i32 = 32635;

/// Compand one 16-bit linear sample to a μ-law byte.
pub fn linear_to_mu_law(sample: i16) -> u8 {
    let mut pcm = sample as i32;
    let sign: u8 = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0x00
    };
    if pcm > CLIP {
        pcm = CLIP;
    }
    pcm += BIAS;

    // Segment number: position of the highest set bit above bit 7.
    let mut exp: u32 = 7;
    let mut mask = 0x4000;
    while exp > 0 && (pcm & mask) == 0 {
        exp -= 1;
        mask >>= 1;
    }

    let mantissa = ((pcm >> (exp + 3)) & 0x0F) as u8;
    !(sign | ((exp as u8) << 4) | mantissa)
}

/// Expand one μ-law byte to a 16-bit linear sample.
pub fn mu_law_to_linear(mu_law: u8) -> i16 {
    let mu_law = !mu_law;
    let sign = (mu_law & 0x80) != 0;
    let exp = ((mu_law >> 4) & 0x07) as u32;
    let mantissa = (mu_law & 0x0F) as i32;

    let pcm = (((mantissa << 3) + BIAS) << exp) - BIAS;

    if sign { -pcm as i16 } else { pcm as i16 }
}

/// Decode a μ-law byte stream to linear samples.
pub fn decode_mu_law(data: &[u8]) -> Vec<i16> {
    data.iter().map(|&b| mu_law_to_linear(b)).collect()
}

/// Encode linear samples as a μ-law byte stream.
pub fn encode_mu_law(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| linear_to_mu_law(s)).collect()
}
