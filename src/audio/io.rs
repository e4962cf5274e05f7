//! Audio file I/O for Tono
//!
//! Decodes audio files into a mono [`Signal`] at the analysis sample rate.
//! WAV files go through hound; every other container is probed by symphonia.
//!
//! Loading mirrors what the model artifacts were trained on: channels are
//! averaged to mono, the signal is cut to the duration cap at its native rate,
//! and only then resampled.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::audio::Signal;
use crate::config::AnalysisConfig;
use crate::error::{Result, TonoError};

/// Interleaved samples as they came out of a decoder
#[derive(Debug, Clone)]
struct DecodedAudio {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

/// Load an audio file as a mono signal ready for analysis
///
/// # Arguments
/// * `path` - Path to the audio file
/// * `config` - Analysis configuration (target rate and duration cap)
///
/// # Returns
/// * `Ok(Signal)` - Mono samples at `config.sample_rate`
/// * `Err(TonoError)` - If the file cannot be decoded or holds no samples
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If no decoder accepts the file
/// * `UnsupportedFormat` - If the sample encoding is not supported
/// * `EmptyAudio` - If decoding produced no samples
pub fn load_signal(path: &Path, config: &AnalysisConfig) -> Result<Signal> {
    if !path.is_file() {
        return Err(TonoError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let decoded = if is_wav(path) {
        read_wav(path, config)?
    } else {
        read_with_symphonia(path, config)?
    };

    if decoded.sample_rate == 0 || decoded.channels == 0 {
        return Err(TonoError::InvalidAudio {
            reason: format!(
                "{} reports {} Hz with {} channels",
                path.display(),
                decoded.sample_rate,
                decoded.channels
            ),
            source: None,
        });
    }

    let mut mono = mix_to_mono(&decoded.samples, decoded.channels);
    mono.truncate(config.max_samples_at(decoded.sample_rate));

    if mono.is_empty() {
        return Err(TonoError::EmptyAudio);
    }

    let samples = resample(&mono, decoded.sample_rate, config.sample_rate)?;

    debug!(
        "Loaded {} ({} ch @ {} Hz) -> {} samples @ {} Hz",
        path.display(),
        decoded.channels,
        decoded.sample_rate,
        samples.len(),
        config.sample_rate
    );

    Ok(Signal::new(samples, config.sample_rate))
}

/// Write a signal to a 32-bit float mono WAV file
///
/// # Arguments
/// * `signal` - The signal to write
/// * `path` - Path where the file will be written
pub fn export_wav(signal: &Signal, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: signal.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(hound_to_io)?;
    for &sample in signal.samples() {
        writer.write_sample(sample).map_err(hound_to_io)?;
    }
    writer.finalize().map_err(hound_to_io)?;

    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"))
        .unwrap_or(false)
}

fn hound_to_io(e: hound::Error) -> TonoError {
    match e {
        hound::Error::IoError(io) => TonoError::Io(io),
        other => TonoError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

/// Read a WAV file with hound, stopping at the duration cap
fn read_wav(path: &Path, config: &AnalysisConfig) -> Result<DecodedAudio> {
    let reader = WavReader::open(path).map_err(|e| TonoError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let limit = config
        .max_samples_at(spec.sample_rate)
        .saturating_mul(spec.channels as usize);
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format, limit)?;

    Ok(DecodedAudio {
        samples,
        channels: spec.channels as usize,
        sample_rate: spec.sample_rate,
    })
}

/// Read at most `limit` interleaved samples and convert them to f32
///
/// Bytes past the limit are never read, so a damaged tail beyond the
/// duration cap does not fail the load.
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
    limit: usize,
) -> Result<Vec<f32>> {
    let invalid = |bits: &str, e: hound::Error| TonoError::InvalidAudio {
        reason: format!("Failed to read {} samples: {}", bits, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .take(limit)
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| invalid("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .take(limit)
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .take(limit)
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("16-bit", e)),
            // 24-bit stored as i32 in hound
            24 => reader
                .samples::<i32>()
                .take(limit)
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .take(limit)
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("32-bit int", e)),
            _ => Err(TonoError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}

/// Decode any other container with symphonia, stopping at the duration cap
fn read_with_symphonia(path: &Path, config: &AnalysisConfig) -> Result<DecodedAudio> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::errors::Error as SymphoniaError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let src = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| TonoError::InvalidAudio {
            reason: format!("failed to probe {}: {}", path.display(), e),
            source: Some(Box::new(e)),
        })?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| TonoError::InvalidAudio {
            reason: format!("{} has no default audio track", path.display()),
            source: None,
        })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| TonoError::UnsupportedFormat {
            format: format!("codec in {}: {}", path.display(), e),
        })?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(err) if is_end_of_stream(&err) => break,
            Err(err) => {
                return Err(TonoError::InvalidAudio {
                    reason: format!("failed to read packet from {}: {}", path.display(), err),
                    source: Some(Box::new(err)),
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let rate = *sample_rate.get_or_insert(spec.rate);
                let count = *channels.get_or_insert(spec.channels.count());

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());

                if count > 0 && samples.len() / count >= config.max_samples_at(rate) {
                    break;
                }
            }
            Err(SymphoniaError::DecodeError(err)) => {
                warn!("skipping corrupt packet in {}: {}", path.display(), err);
            }
            Err(err) => {
                return Err(TonoError::InvalidAudio {
                    reason: format!("decode error for {}: {}", path.display(), err),
                    source: Some(Box::new(err)),
                });
            }
        }
    }

    let sample_rate = sample_rate.ok_or_else(|| TonoError::InvalidAudio {
        reason: format!("missing sample rate for {}", path.display()),
        source: None,
    })?;

    Ok(DecodedAudio {
        samples,
        channels: channels.unwrap_or(1),
        sample_rate,
    })
}

/// Symphonia signals the end of a stream as an `UnexpectedEof` I/O error
fn is_end_of_stream(err: &symphonia::core::errors::Error) -> bool {
    matches!(
        err,
        symphonia::core::errors::Error::IoError(io)
            if io.kind() == std::io::ErrorKind::UnexpectedEof
    )
}

/// Average interleaved channels into one
fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Band-limited sinc resampling
///
/// The output length is `ceil(len * to / from)`.
fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>> {
    if from_hz == 0 || to_hz == 0 {
        return Err(TonoError::Resample {
            reason: format!("invalid sample rates: {} Hz -> {} Hz", from_hz, to_hz),
        });
    }
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_hz as f64 / from_hz as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| TonoError::Resample {
            reason: format!("resampler creation failed ({} -> {} Hz): {}", from_hz, to_hz, e),
        })?;

    let waves_in = vec![samples.to_vec()];
    let mut waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| TonoError::Resample {
            reason: e.to_string(),
        })?;

    let mut output = waves_out.pop().ok_or_else(|| TonoError::Resample {
        reason: "resampler returned no output channels".to_string(),
    })?;

    let expected = (samples.len() as f64 * ratio).ceil() as usize;
    output.resize(expected, 0.0);

    Ok(output)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    fn write_int_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[Vec<i16>]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_mix_to_mono_averages_channels() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(mix_to_mono(&interleaved, 2), vec![0.5, 0.5, 0.0]);
        assert_eq!(mix_to_mono(&interleaved, 1), interleaved);
    }

    #[test]
    fn test_resample_identity() {
        let x = vec![0.0f32, 0.5, -0.25, 1.0];
        assert_eq!(resample(&x, 22_050, 22_050).unwrap(), x);
    }

    #[test]
    fn test_resample_length() {
        let x = Signal::sine(440.0, 1.0, 44_100).into_samples();
        let y = resample(&x, 44_100, 22_050).unwrap();
        assert_eq!(y.len(), 22_050);

        let z = resample(&x[..1001], 44_100, 22_050).unwrap();
        assert_eq!(z.len(), 501);
    }

    #[test]
    fn test_resample_rejects_zero_rate() {
        let err = resample(&[0.0, 1.0], 0, 22_050).unwrap_err();
        assert_eq!(err.error_code(), "RESAMPLE_ERROR");
    }

    #[test]
    fn test_load_float_wav_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let original = Signal::sine(440.0, 0.5, 22_050);
        export_wav(&original, &path).unwrap();

        let loaded = load_signal(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(loaded.sample_rate(), 22_050);
        assert_eq!(loaded.len(), original.len());
        for (a, b) in original.samples().iter().zip(loaded.samples()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_stereo_int_wav_is_mono() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames: Vec<Vec<i16>> = (0..2205).map(|_| vec![16384, -16384]).collect();
        write_int_wav(&path, 2, 22_050, &frames);

        let loaded = load_signal(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(loaded.len(), 2205);
        assert!(loaded.samples().iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn test_load_truncates_to_duration_cap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.wav");
        export_wav(&Signal::sine(220.0, 3.0, 22_050), &path).unwrap();

        let config = AnalysisConfig::default().with_max_duration(1.0);
        let loaded = load_signal(&path, &config).unwrap();
        assert_eq!(loaded.len(), 22_050);
    }

    #[test]
    fn test_load_resamples_native_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hi_rate.wav");
        export_wav(&Signal::sine(440.0, 0.5, 44_100), &path).unwrap();

        let loaded = load_signal(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(loaded.sample_rate(), 22_050);
        assert_eq!(loaded.len(), 11_025);
    }

    #[test]
    fn test_load_empty_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_int_wav(&path, 1, 22_050, &[]);

        let err = load_signal(&path, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, TonoError::EmptyAudio));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = load_signal(
            Path::new("/nonexistent/path/audio.wav"),
            &AnalysisConfig::default(),
        )
        .unwrap_err();

        match err {
            TonoError::FileNotFound { path, .. } => assert!(path.contains("nonexistent")),
            other => panic!("Expected FileNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_wav_stops_reading_at_duration_cap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("damaged_tail.wav");
        let frames: Vec<Vec<i16>> = (0..8 * 22_050)
            .map(|i| vec![((i % 200) as i16 - 100) * 100])
            .collect();
        write_int_wav(&path, 1, 22_050, &frames);

        // Cut the last byte so the final sample cannot be read
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        let len = file.metadata().unwrap().len();
        file.set_len(len - 1).unwrap();
        drop(file);

        let loaded = load_signal(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(loaded.len(), 5 * 22_050);
        assert_abs_diff_eq!(loaded.samples()[199], 99.0 * 100.0 / 32768.0);
    }

    #[test]
    fn test_symphonia_reads_to_end_of_stream() {
        let dir = tempdir().unwrap();
        let wav = dir.path().join("tone.wav");
        export_wav(&Signal::sine(330.0, 1.5, 22_050), &wav).unwrap();

        // Unknown extension goes through symphonia, which detects the WAV
        let other = dir.path().join("tone.snd");
        std::fs::copy(&wav, &other).unwrap();

        let config = AnalysisConfig::default();
        let via_hound = load_signal(&wav, &config).unwrap();
        let via_symphonia = load_signal(&other, &config).unwrap();
        assert_eq!(via_symphonia.len(), via_hound.len());
        for (a, b) in via_hound.samples().iter().zip(via_symphonia.samples()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_only_eof_ends_the_packet_stream() {
        use std::io::{Error as IoError, ErrorKind};
        use symphonia::core::errors::Error as SymphoniaError;

        let eof = SymphoniaError::IoError(IoError::new(ErrorKind::UnexpectedEof, "end of stream"));
        assert!(is_end_of_stream(&eof));

        let io = SymphoniaError::IoError(IoError::new(ErrorKind::PermissionDenied, "denied"));
        assert!(!is_end_of_stream(&io));
        assert!(!is_end_of_stream(&SymphoniaError::DecodeError("bad frame")));
        assert!(!is_end_of_stream(&SymphoniaError::ResetRequired));
    }

    #[test]
    fn test_load_garbage_is_invalid() {
        let dir = tempdir().unwrap();
        let wav = dir.path().join("garbage.wav");
        let mp3 = dir.path().join("garbage.mp3");
        std::fs::write(&wav, b"definitely not audio").unwrap();
        std::fs::write(&mp3, b"definitely not audio").unwrap();

        let config = AnalysisConfig::default();
        assert!(load_signal(&wav, &config).unwrap_err().is_audio_error());
        assert!(load_signal(&mp3, &config).unwrap_err().is_audio_error());
    }
}
