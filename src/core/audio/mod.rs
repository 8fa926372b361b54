//! Audio transcoding between the telephony and agent legs.
//!
//! Telephony audio is narrowband: 8 kHz mono μ-law, one byte per sample.
//! The agent leg optionally runs wideband: 16 kHz mono PCM 16-bit signed
//! little-endian, raw sample stream with no container header.
//!
//! Both conversions are pure, stateless and lossy. Invalid input (empty
//! buffers, PCM streams with a dangling byte) produces an *empty* buffer
//! rather than an error: the relay pumps treat empty output as "nothing to
//! forward" and keep the session alive.
//!
//! These are synchronous CPU-bound functions. Relay pumps call them through
//! [`transcode_blocking`], which dispatches onto the blocking thread pool so
//! per-chunk conversion never stalls the async scheduler.

mod g711;
mod resample;

pub use g711::{decode_mu_law, encode_mu_law, linear_to_mu_law, mu_law_to_linear};
pub use resample::{downsample_2x, upsample_2x};

use bytes::Bytes;

/// Narrowband (telephony) sample rate in Hz.
pub const NARROWBAND_SAMPLE_RATE: u32 = 8000;

/// Wideband (agent) sample rate in Hz.
pub const WIDEBAND_SAMPLE_RATE: u32 = 16000;

/// Process-wide transcoding mode, fixed at startup.
///
/// `Passthrough` forwards μ-law bytes to the agent unmodified (the agent is
/// configured for μ-law 8 kHz on both input and output). `Wideband` converts
/// to PCM16 16 kHz on the way out and back to μ-law on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeMode {
    Passthrough,
    Wideband,
}

impl TranscodeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeMode::Passthrough => "passthrough",
            TranscodeMode::Wideband => "wideband",
        }
    }
}

/// Convert 8 kHz μ-law bytes to 16 kHz PCM16-LE bytes.
///
/// Returns an empty buffer for empty input.
pub fn narrowband_to_wideband(audio: &[u8]) -> Bytes {
    if audio.is_empty() {
        return Bytes::new();
    }

    let narrow = decode_mu_law(audio);
    let wide = upsample_2x(&narrow);

    let mut out = Vec::with_capacity(wide.len() * 2);
    for sample in wide {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    Bytes::from(out)
}

/// Convert 16 kHz PCM16-LE bytes to 8 kHz μ-law bytes.
///
/// Returns an empty buffer for empty input or a malformed (odd-length)
/// sample stream.
pub fn wideband_to_narrowband(audio: &[u8]) -> Bytes {
    if audio.is_empty() || audio.len() % 2 != 0 {
        return Bytes::new();
    }

    let wide: Vec<i16> = audio
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    let narrow = downsample_2x(&wide);

    Bytes::from(encode_mu_law(&narrow))
}

/// Direction of a transcoding step.
#[derive(Debug, Clone, Copy)]
pub enum TranscodeDirection {
    /// Telephony → agent: μ-law 8 kHz in, PCM16 16 kHz out.
    ToWideband,
    /// Agent → telephony: PCM16 16 kHz in, μ-law 8 kHz out.
    ToNarrowband,
}

/// Run one conversion on the blocking thread pool.
///
/// Returns an empty buffer if the blocking task is cancelled at runtime
/// shutdown; callers already treat empty as "skip this chunk".
pub async fn transcode_blocking(direction: TranscodeDirection, audio: Bytes) -> Bytes {
    let result = tokio::task::spawn_blocking(move || match direction {
        TranscodeDirection::ToWideband => narrowband_to_wideband(&audio),
        TranscodeDirection::ToNarrowband => wideband_to_narrowband(&audio),
    })
    .await;

    match result {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Transcode task failed: {}", e);
            Bytes::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowband_chunk_doubles_in_samples_and_quadruples_in_bytes() {
        // A 20ms telephony frame is 160 μ-law bytes; wideband PCM16 at
        // twice the rate is 640 bytes.
        let chunk = vec![0x7Fu8; 160];
        let wide = narrowband_to_wideband(&chunk);
        assert_eq!(wide.len(), 640);
    }

    #[test]
    fn wideband_chunk_shrinks_to_quarter() {
        let chunk = vec![0u8; 640];
        let narrow = wideband_to_narrowband(&chunk);
        assert_eq!(narrow.len(), 160);
    }

    #[test]
    fn non_empty_valid_input_yields_non_empty_output() {
        assert!(!narrowband_to_wideband(&[0xFF, 0x7F, 0x00]).is_empty());
        assert!(!wideband_to_narrowband(&[0, 0, 1, 0]).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(narrowband_to_wideband(&[]).is_empty());
        assert!(wideband_to_narrowband(&[]).is_empty());
    }

    #[test]
    fn odd_length_pcm_stream_yields_empty_output() {
        assert!(wideband_to_narrowband(&[0, 0, 1]).is_empty());
    }

    #[test]
    fn round_trip_is_lossy_but_stable() {
        // μ-law -> PCM16 -> μ-law is not bit-exact; only shape is preserved.
        let chunk: Vec<u8> = (0..160).map(|i| (i % 256) as u8).collect();
        let back = wideband_to_narrowband(&narrowband_to_wideband(&chunk));
        assert_eq!(back.len(), chunk.len());
    }

    #[tokio::test]
    async fn blocking_dispatch_matches_sync_result() {
        let chunk = Bytes::from(vec![0xFFu8; 160]);
        let via_pool = transcode_blocking(TranscodeDirection::ToWideband, chunk.clone()).await;
        assert_eq!(via_pool, narrowband_to_wideband(&chunk));
    }
}
