//! RIFF/WAVE container helpers for exported PCM16 recordings.
//!
//! Layout of the 44-byte header:
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    36 + data_size
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * block_align
//! [32-33]  block_align = channels * 2
//! [34-35]  16
//! [36-39]  "data"
//! [40-43]  data_size
//! ```

use crate::models::config::AudioSessionConfig;
use crate::models::error::{BridgeError, BridgeResult};
use crate::processing::pcm;

pub const WAV_HEADER_SIZE: usize = 44;

pub const WAV_MIME_TYPE: &str = "audio/wav";

pub fn generate_wav_header(config: &AudioSessionConfig, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let channels = config.channels.count();
    let block_align = config.block_align();
    let byte_rate = config.sample_rate_hz * block_align as u32;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&config.sample_rate_hz.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&config.bits_per_sample().to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Serialize samples as a complete in-memory WAV file.
pub fn encode_wav(config: &AudioSessionConfig, samples: &[i16]) -> BridgeResult<Vec<u8>> {
    let data = pcm::encode_le(samples);
    // RIFF sizes are 32-bit and the chunk size adds 36 on top of the data.
    let data_size = u32::try_from(data.len())
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| BridgeError::Storage(format!("recording too large for WAV: {} bytes", data.len())))?;

    let mut wav = Vec::with_capacity(WAV_HEADER_SIZE + data.len());
    wav.extend_from_slice(&generate_wav_header(config, data_size));
    wav.extend_from_slice(&data);
    Ok(wav)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    }

    #[test]
    fn header_magic() {
        let header = generate_wav_header(&AudioSessionConfig::default(), 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_48khz_stereo() {
        let config = AudioSessionConfig::new(48_000, 2).unwrap();
        let header = generate_wav_header(&config, 9_600);

        assert_eq!(read_u16(&header, 20), 1);
        assert_eq!(read_u16(&header, 22), 2);
        assert_eq!(read_u32(&header, 24), 48_000);
        assert_eq!(read_u32(&header, 28), 192_000);
        assert_eq!(read_u16(&header, 32), 4);
        assert_eq!(read_u16(&header, 34), 16);
        assert_eq!(read_u32(&header, 40), 9_600);
        assert_eq!(read_u32(&header, 4), 36 + 9_600);
    }

    #[test]
    fn encode_wav_appends_le_payload() {
        let config = AudioSessionConfig::new(16_000, 1).unwrap();
        let wav = encode_wav(&config, &[0x1234, -2]).unwrap();

        assert_eq!(wav.len(), WAV_HEADER_SIZE + 4);
        assert_eq!(read_u32(&wav, 40), 4);
        assert_eq!(read_u32(&wav, 28), 32_000);
        assert_eq!(&wav[44..], &[0x34, 0x12, 0xFE, 0xFF]);
    }
}
