//! WAV renderer: encodes rendered samples and melodies as WAV bytes.

use crate::instrument::InstrumentConfig;
use crate::melody::{render_melody, Melody};
use crate::options::InstrumentOverrides;

/// Render a melody to a 16-bit mono PCM WAV file as bytes.
pub fn render_melody_wav(
    melody: &Melody,
    options: &InstrumentOverrides,
    config: &InstrumentConfig,
    sample_rate: u32,
) -> Vec<u8> {
    let samples = render_melody(melody, options, config, sample_rate as f64);
    render_wav(&samples, sample_rate)
}

/// Encode mono samples in [-1, 1] as 16-bit PCM WAV.
pub fn render_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let pcm: Vec<i16> = samples.iter().map(|&s| to_i16(s)).collect();
    encode_wav(&pcm, sample_rate, 1)
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melody::mario_options;
    use std::io::Cursor;

    #[test]
    fn wav_header_valid() {
        let wav = render_wav(&[0.0, 0.5, -0.5, 1.0], 22050);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(wav.len(), 44 + 8);

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
    }

    #[test]
    fn samples_survive_encoding() {
        let wav = render_wav(&[0.0, 0.5, -0.5, 2.0], 8000);
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![0, 16383, -16383, i16::MAX]);
    }

    #[test]
    fn mario_renders_to_non_silent_wav() {
        let wav = render_melody_wav(
            &Melody::mario(),
            &mario_options(),
            &InstrumentConfig::default(),
            8000,
        );
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.duration(), 16 * 1600);
        assert!(reader.samples::<i16>().any(|s| s.unwrap() != 0));
    }
}
