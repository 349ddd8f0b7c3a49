use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

/// Mono samples at the file's native rate.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    /// Channel-averaged samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    /// Native sample rate of the file.
    pub sample_rate: u32,
}

/// Decode an audio file into mono f32 samples.
///
/// Supports WAV, MP3, FLAC, OGG via symphonia. When `max_secs` is set, decoding
/// stops once that much audio is available and the result is truncated to it.
///
/// # Errors
/// Returns [`AudioError::ResourceNotFound`] if the file does not exist and
/// [`AudioError::Decode`] if it cannot be probed or yields no samples.
///
/// # Example
/// ```no_run
/// use gc_audio::decode::decode_file;
/// let audio = decode_file("recorded.wav", Some(2.0)).unwrap();
/// println!("{} samples @ {} Hz", audio.samples.len(), audio.sample_rate);
/// ```
pub fn decode_file(
    path: impl AsRef<Path>,
    max_secs: Option<f32>,
) -> Result<DecodedAudio, AudioError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AudioError::ResourceNotFound {
            path: path.to_path_buf(),
        },
        _ => AudioError::Decode(format!("Cannot open {}: {e}", path.display())),
    })?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

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
        .map_err(|e| AudioError::Decode(format!("Failed to probe audio format: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("No default audio track found".into()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("Unknown sample rate".into()))?;

    let max_frames = max_secs.map(|secs| (secs * sample_rate as f32).ceil() as usize);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("Failed to create audio decoder: {e}")))?;

    let track_id = track.id;
    let mut all_samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;
    let mut channels: usize = 1;

    loop {
        if max_frames.is_some_and(|max| all_samples.len() >= max) {
            break;
        }

        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                log::warn!("Audio decode packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Audio decode frame error: {e}");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        // The decoded buffer is authoritative: the track header may omit channels.
        channels = spec.channels.count().max(1);
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        // Downmix to mono
        all_samples.extend(
            buf.samples()
                .chunks(channels)
                .map(|chunk| chunk.iter().sum::<f32>() / channels as f32),
        );
    }

    if let Some(max) = max_frames {
        all_samples.truncate(max);
    }

    if all_samples.is_empty() {
        return Err(AudioError::Decode(format!(
            "No audio samples in {}",
            path.display()
        )));
    }

    log::info!(
        "Decoded {} samples @ {}Hz ({} channel(s)) from {}",
        all_samples.len(),
        sample_rate,
        channels,
        path.display()
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav<const N: usize>(path: &Path, channels: u16, rate: u32, frames: &[[i16; N]]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in &frame[..channels as usize] {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn missing_file_is_resource_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_file(dir.path().join("absent.wav"), None).unwrap_err();
        assert!(err.is_not_found(), "got {err:?}");
    }

    #[test]
    fn garbage_bytes_are_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();
        let err = decode_file(&path, None).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn stereo_is_downmixed_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames = vec![[16384i16, -16384i16]; 8000];
        write_wav(&path, 2, 8000, &frames);

        let audio = decode_file(&path, Some(0.5)).unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.samples.len(), 4000);
        assert!(
            audio.samples.iter().all(|s| s.abs() < 1e-4),
            "opposite channels cancel out"
        );
    }

    #[test]
    fn empty_wav_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav::<1>(&path, 1, 22050, &[]);
        assert!(matches!(
            decode_file(&path, None),
            Err(AudioError::Decode(_))
        ));
    }

    #[test]
    fn every_channel_of_the_decoded_buffer_is_averaged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("three.wav");
        write_wav(&path, 3, 8000, &vec![[3000i16, 6000, 9000]; 800]);

        let audio = decode_file(&path, None).unwrap();
        assert_eq!(audio.samples.len(), 800, "one mono sample per frame");
        let expected = 6000.0 / 32768.0;
        assert!(
            audio.samples.iter().all(|s| (s - expected).abs() < 1e-3),
            "mean of the three channels"
        );
    }
}
