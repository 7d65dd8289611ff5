use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{SyncError, SyncResult};

/// Decoded audio as mono PCM samples at a fixed sample rate.
#[derive(Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

fn audio_err(path: &Path, message: impl ToString) -> SyncError {
    SyncError::Audio {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Decode an audio file to mono PCM at `target_sample_rate`.
///
/// Stereo input is averaged down to one channel. Tempo analysis only
/// needs the envelope, so a low target rate (11025 Hz) keeps this
/// cheap.
pub fn decode_audio(path: &Path, target_sample_rate: u32) -> SyncResult<DecodedAudio> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| audio_err(path, format!("unrecognized format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| audio_err(path, "no default audio track"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| audio_err(path, format!("no decoder: {e}")))?;

    let mut sample_buf = None;
    let mut all_samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(audio_err(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                if sample_buf.is_none() {
                    let spec = *audio_buf.spec();
                    let capacity = audio_buf.capacity() as u64;
                    sample_buf = Some(SampleBuffer::<f32>::new(capacity, spec));
                }
                if let Some(ref mut buf) = sample_buf {
                    buf.copy_interleaved_ref(audio_buf);
                    all_samples.extend_from_slice(buf.samples());
                }
            }
            // A corrupt packet; keep decoding the rest.
            Err(symphonia::core::errors::Error::DecodeError(_)) => {}
            Err(e) => return Err(audio_err(path, e)),
        }
    }

    let channels = codec_params.channels.map_or(1, |c| c.count());
    let mono_samples = if channels > 1 {
        all_samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    } else {
        all_samples
    };

    let source_rate = codec_params.sample_rate.unwrap_or(44100);
    let resampled = if source_rate == target_sample_rate {
        mono_samples
    } else {
        resample_linear(&mono_samples, source_rate, target_sample_rate)
    };

    let duration_secs = resampled.len() as f64 / f64::from(target_sample_rate);

    Ok(DecodedAudio {
        samples: resampled,
        sample_rate: target_sample_rate,
        duration_secs,
    })
}

/// Linear-interpolation resampler. Adequate for envelope analysis;
/// nothing downstream listens to the result.
#[allow(clippy::cast_sign_loss)]
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        if idx + 1 < samples.len() {
            let frac = (pos - idx as f64) as f32;
            output.push(samples[idx].mul_add(1.0 - frac, samples[idx + 1] * frac));
        } else if idx < samples.len() {
            output.push(samples[idx]);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(resample_linear(&samples, 44100, 44100), samples);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(resample_linear(&samples, 44100, 22050).len(), 2);
    }

    #[test]
    fn test_resample_doubles_length() {
        let samples = vec![1.0, 2.0];
        assert_eq!(resample_linear(&samples, 22050, 44100).len(), 4);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(matches!(
            decode_audio(&path, 11025),
            Err(SyncError::Audio { .. })
        ));
    }
}
