//! Decode an input file into a mono `f32` [`Track`] via Symphonia.
//!
//! Responsibilities:
//! - Probe the container and select a reasonable default audio track
//! - Decode packets with a predictable, recoverable error policy
//! - Downmix interleaved PCM to mono at the source sample rate
//!
//! The rest of the pipeline never touches codec or container concerns: this module is
//! the entire decoding-collaborator seam. Output stays at the source sample rate —
//! nothing downstream needs a fixed rate, and the rendered teaser should match its
//! source exactly.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};
use crate::track::Track;

/// Decode a media file into a mono track.
///
/// Track selection policy: the first track with a decodable codec and a known
/// sample rate. Fails with [`Error::Decode`] when the file cannot be probed,
/// no audio track exists, or decoding yields zero samples.
pub fn decode_track(path: impl AsRef<Path>) -> Result<Track> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| decode_err(path, e.to_string()))?;

    let mss = MediaSourceStream::new(
        Box::new(file),
        MediaSourceStreamOptions {
            // Symphonia expects a power-of-two buffer > 32KiB for good probing behavior.
            buffer_len: 256 * 1024,
        },
    );

    // The extension improves probe accuracy for ambiguous containers.
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
        .map_err(|e| decode_err(path, format!("failed to probe media: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| decode_err(path, "no audio track found".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(path, format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut sample_rate = 0u32;
    let mut channels = 0usize;

    loop {
        let packet = match next_packet(&mut format) {
            Ok(Some(p)) => p,
            Ok(None) => break,
            Err(e) => return Err(decode_err(path, e)),
        };

        if packet.track_id() != track.id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                if channels == 0 {
                    return Err(decode_err(path, "decoded audio had zero channels".into()));
                }

                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                });
                buf.copy_interleaved_ref(decoded);
                downmix_into(&mut samples, buf.samples(), channels);
            }
            // Recoverable: corrupted frame, but decoding can continue.
            Err(SymphoniaError::DecodeError(_)) => continue,
            // Treat IO errors as graceful end-of-stream.
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(decode_err(path, format!("decoder failure: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(decode_err(path, "file produced no decodable samples".into()));
    }

    Ok(Track {
        source: path.to_path_buf(),
        samples,
        sample_rate,
        channels,
    })
}

/// Read the next packet, treating IO errors as "end of stream".
fn next_packet(
    format: &mut Box<dyn FormatReader>,
) -> std::result::Result<Option<symphonia::core::formats::Packet>, String> {
    match format.next_packet() {
        Ok(p) => Ok(Some(p)),
        Err(SymphoniaError::IoError(_)) => Ok(None),
        Err(e) => Err(format!("failed reading packet: {e}")),
    }
}

/// Downmix interleaved samples into mono by averaging channels.
///
/// Policy: equal-weight average across channels (simple, predictable).
fn downmix_into(mono: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels == 1 {
        mono.extend_from_slice(interleaved);
        return;
    }

    let frames = interleaved.len() / channels;
    mono.reserve(frames);
    for f in 0..frames {
        let base = f * channels;
        let mut acc = 0.0;
        for c in 0..channels {
            acc += interleaved[base + c];
        }
        mono.push(acc / channels as f32);
    }
}

fn decode_err(path: &Path, reason: String) -> Error {
    Error::Decode {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_single_channel_is_identity() {
        let mut mono = Vec::new();
        downmix_into(&mut mono, &[0.0, 1.0, -1.0], 1);
        assert_eq!(mono, vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn downmix_averages_channels() {
        // Two frames of stereo: (L=1, R=3), (L=-1, R=1) => mono: 2, 0
        let mut mono = Vec::new();
        downmix_into(&mut mono, &[1.0, 3.0, -1.0, 1.0], 2);
        assert_eq!(mono, vec![2.0, 0.0]);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = decode_track("/nonexistent/episode.mp3").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
