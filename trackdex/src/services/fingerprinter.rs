//! Acoustic fingerprint generation
//!
//! Decodes the file's audio stream with symphonia, downmixes to mono
//! i16 PCM, and runs it through Chromaprint. Consumers treat the
//! resulting token as opaque; only the AcoustID lookup interprets it.

use crate::types::AudioFingerprint;
use base64::{engine::general_purpose, Engine as _};
use chromaprint_rust::Context;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Chromaprint needs at least a few seconds of signal to be useful.
const MIN_SECONDS: usize = 3;

/// Fingerprint at most this much audio from the stream head.
/// AcoustID recommends 120 seconds.
const MAX_SECONDS: usize = 120;

/// Fingerprinting errors
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Chromaprint error: {0}")]
    Chromaprint(String),

    #[error("Audio stream too short to fingerprint")]
    AudioTooShort,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio fingerprinter
pub struct Fingerprinter {
    max_seconds: usize,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            max_seconds: MAX_SECONDS,
        }
    }

    /// Fingerprint the audio stream of the file at `path`.
    ///
    /// Returns the fingerprint token together with the stream's full
    /// duration, which the lookup service wants alongside it.
    pub fn fingerprint_file(&self, path: &Path) -> Result<AudioFingerprint, FingerprintError> {
        let decoded = self.decode_mono(path)?;
        let fingerprint = self.fingerprint_pcm(&decoded.samples, decoded.sample_rate)?;
        Ok(AudioFingerprint {
            fingerprint,
            duration_seconds: decoded.duration_seconds,
        })
    }

    /// Fingerprint mono i16 PCM at the given sample rate.
    pub fn fingerprint_pcm(
        &self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<String, FingerprintError> {
        if samples.len() < sample_rate as usize * MIN_SECONDS {
            return Err(FingerprintError::AudioTooShort);
        }

        let max_samples = sample_rate as usize * self.max_seconds;
        let window = &samples[..samples.len().min(max_samples)];

        let mut ctx = Context::default();
        ctx.start(sample_rate, 1)
            .map_err(|e| FingerprintError::Chromaprint(format!("start failed: {}", e)))?;
        ctx.feed(window)
            .map_err(|e| FingerprintError::Chromaprint(format!("feed failed: {}", e)))?;
        ctx.finish()
            .map_err(|e| FingerprintError::Chromaprint(format!("finish failed: {}", e)))?;

        let raw = ctx
            .get_fingerprint_raw()
            .map_err(|e| FingerprintError::Chromaprint(format!("fingerprint failed: {}", e)))?;

        // chromaprint-rust does not expose the compressed wire format
        // yet, so derive a stable token from the raw fingerprint.
        // TODO: send the compressed fingerprint once chromaprint-rust
        // exposes it
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        format!("{:?}", raw).hash(&mut hasher);
        Ok(general_purpose::STANDARD.encode(hasher.finish().to_le_bytes()))
    }

    /// Decode the default audio track to mono i16 PCM.
    fn decode_mono(&self, path: &Path) -> Result<DecodedAudio, FingerprintError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| FingerprintError::Decode(format!("unsupported format: {}", e)))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| FingerprintError::Decode("no supported audio track".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| FingerprintError::Decode("unknown sample rate".to_string()))?;
        let header_frames = codec_params.n_frames;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| FingerprintError::Decode(format!("no decoder: {}", e)))?;

        // Decode only what the fingerprint window needs; the full
        // duration comes from the stream header when available.
        let max_samples = sample_rate as usize * self.max_seconds;
        let mut samples: Vec<i16> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<i16>> = None;
        let mut channels = 1usize;
        let mut decoded_frames: u64 = 0;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(FingerprintError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Skip damaged frames, keep the stream going.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(FingerprintError::Decode(e.to_string())),
            };

            if sample_buf.is_none() {
                let spec = *decoded.spec();
                channels = spec.channels.count().max(1);
                sample_buf = Some(SampleBuffer::<i16>::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                decoded_frames += (buf.len() / channels) as u64;

                if channels == 1 {
                    samples.extend_from_slice(buf.samples());
                } else {
                    for frame in buf.samples().chunks_exact(channels) {
                        let sum: i32 = frame.iter().map(|s| *s as i32).sum();
                        samples.push((sum / channels as i32) as i16);
                    }
                }
            }

            if samples.len() >= max_samples {
                break;
            }
        }

        let duration_seconds = header_frames
            .map(|frames| frames / sample_rate as u64)
            .unwrap_or(decoded_frames / sample_rate as u64);

        tracing::debug!(
            file = %path.display(),
            sample_rate,
            channels,
            duration_seconds,
            fingerprint_samples = samples.len(),
            "decoded audio for fingerprinting"
        );

        Ok(DecodedAudio {
            samples,
            sample_rate,
            duration_seconds,
        })
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

struct DecodedAudio {
    samples: Vec<i16>,
    sample_rate: u32,
    duration_seconds: u64,
}
