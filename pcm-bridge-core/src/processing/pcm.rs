use crate::models::error::{BridgeError, BridgeResult};

/// Encode PCM16 samples as little-endian bytes.
///
/// Output length is always `samples.len() * 2`; `0x1234` becomes `[0x34, 0x12]`.
pub fn encode_le(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

/// Decode little-endian PCM16 bytes. Odd lengths are rejected.
pub fn decode_le(bytes: &[u8]) -> BridgeResult<Vec<i16>> {
    if !bytes.len().is_multiple_of(2) {
        return Err(BridgeError::Configuration(format!(
            "PCM16 payload has odd length {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}
