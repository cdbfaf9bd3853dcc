//! Decoded drum samples: WAV loading, mono downmix, and linear resampling.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("WAV file contains no samples")]
    Empty,
}

/// A mono f32 buffer at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleData {
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a WAV stream to mono at `output_rate`.
    ///
    /// Integer PCM of any bit depth and 32-bit float are accepted; channels are
    /// averaged, and the result is resampled when the file's rate differs.
    pub fn from_wav<R: Read + Seek>(reader: R, output_rate: u32) -> Result<Self, SampleError> {
        let wav = hound::WavReader::new(reader)?;
        let spec = wav.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let full_scale = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                wav.into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Float => wav.into_samples::<f32>().collect::<Result<_, _>>()?,
        };
        if interleaved.is_empty() {
            return Err(SampleError::Empty);
        }

        let mono = downmix(&interleaved, usize::from(spec.channels.max(1)));
        let samples = if spec.sample_rate == output_rate {
            mono
        } else {
            resample_linear(&mono, spec.sample_rate, output_rate)
        };
        Ok(Self::from_mono(samples, output_rate))
    }

    pub fn from_wav_file(path: impl AsRef<Path>, output_rate: u32) -> Result<Self, SampleError> {
        let file = File::open(path).map_err(hound::Error::IoError)?;
        Self::from_wav(BufReader::new(file), output_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate.max(1))
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    match input {
        [] => return Vec::new(),
        [only] => return vec![*only],
        _ => {}
    }

    let step = f64::from(from_rate) / f64::from(to_rate.max(1));
    let len = (input.len() as f64 / step).ceil() as usize;
    let last = input.len() - 1;

    (0..len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            match input.get(idx + 1) {
                Some(&next) => input[idx] * (1.0 - frac) + next * frac,
                None => input[idx],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Cursor;

    fn wav_bytes<S: hound::Sample + Copy>(
        samples: &[S],
        sample_rate: u32,
        channels: u16,
        bits: u16,
        format: hound::SampleFormat,
    ) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: bits,
            sample_format: format,
        };
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_16_bit_pcm() {
        let bytes = wav_bytes(&[0i16, 16384, -16384], 44100, 1, 16, hound::SampleFormat::Int);
        let sd = SampleData::from_wav(Cursor::new(bytes), 44100).unwrap();
        assert_eq!(sd.len(), 3);
        assert_approx_eq!(sd.samples()[1], 0.5, 1e-3);
        assert_approx_eq!(sd.samples()[2], -0.5, 1e-3);
    }

    #[test]
    fn stereo_float_is_averaged() {
        let bytes = wav_bytes(&[0.8f32, 0.2, -0.4, -0.6], 48000, 2, 32, hound::SampleFormat::Float);
        let sd = SampleData::from_wav(Cursor::new(bytes), 48000).unwrap();
        assert_eq!(sd.len(), 2);
        assert_approx_eq!(sd.samples()[0], 0.5, 1e-6);
        assert_approx_eq!(sd.samples()[1], -0.5, 1e-6);
    }

    #[test]
    fn empty_wav_is_rejected() {
        let bytes = wav_bytes::<i16>(&[], 44100, 1, 16, hound::SampleFormat::Int);
        let err = SampleData::from_wav(Cursor::new(bytes), 44100).unwrap_err();
        assert!(matches!(err, SampleError::Empty));
    }

    #[test]
    fn garbage_is_a_wav_error() {
        let err = SampleData::from_wav(Cursor::new(b"not a wav".to_vec()), 44100).unwrap_err();
        assert!(matches!(err, SampleError::Wav(_)));
    }

    #[test]
    fn upsampling_doubles_length() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let bytes = wav_bytes(&samples, 22050, 1, 32, hound::SampleFormat::Float);
        let sd = SampleData::from_wav(Cursor::new(bytes), 44100).unwrap();
        assert_eq!(sd.len(), 200);
        assert_eq!(sd.sample_rate(), 44100);
        assert_approx_eq!(sd.samples()[1], 0.005, 1e-6);
    }

    #[test]
    fn resample_edge_cases() {
        assert!(resample_linear(&[], 44100, 22050).is_empty());
        assert_eq!(resample_linear(&[0.5], 44100, 22050), vec![0.5]);
        let same = resample_linear(&[0.1, 0.2, 0.3], 44100, 44100);
        assert_eq!(same.len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SampleData::from_wav_file(dir.path().join("nope.wav"), 44100).unwrap_err();
        assert!(matches!(err, SampleError::Wav(hound::Error::IoError(_))));
    }

    #[test]
    fn duration_in_seconds() {
        let sd = SampleData::from_mono(vec![0.0; 22050], 44100);
        assert_approx_eq!(sd.duration_secs(), 0.5, 1e-9);
    }
}
