use std::io::{Read, Write};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};

use crate::error::LocusError;

const LENGTH_PREFIX: usize = 4;

/// Gzip `data`, prefixed with its uncompressed length as a little-endian `u32`.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, LocusError> {
    let length = u32::try_from(data.len()).map_err(|_| {
        LocusError::Serialization(format!("payload of {} bytes is too large", data.len()))
    })?;

    let mut encoder = GzEncoder::new(
        Vec::with_capacity(LENGTH_PREFIX + data.len() / 2),
        Compression::default(),
    );
    encoder
        .get_mut()
        .extend_from_slice(&length.to_le_bytes());
    encoder
        .write_all(data)
        .map_err(|e| LocusError::Serialization(e.to_string()))?;

    encoder
        .finish()
        .map_err(|e| LocusError::Serialization(e.to_string()))
}

/// Reverses [`compress`]. Any inconsistency is a [`LocusError::CacheCorruption`].
pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, LocusError> {
    if payload.len() < LENGTH_PREFIX {
        return Err(LocusError::CacheCorruption(format!(
            "payload of {} bytes has no length prefix",
            payload.len()
        )));
    }

    let (prefix, compressed) = payload.split_at(LENGTH_PREFIX);
    let mut length = [0u8; LENGTH_PREFIX];
    length.copy_from_slice(prefix);
    let expected = u32::from_le_bytes(length) as usize;

    let mut data = Vec::with_capacity(expected);
    GzDecoder::new(compressed)
        .take(expected as u64 + 1)
        .read_to_end(&mut data)
        .map_err(|e| LocusError::CacheCorruption(e.to_string()))?;

    if data.len() != expected {
        return Err(LocusError::CacheCorruption(format!(
            "expected {} bytes, decompressed {}",
            expected,
            data.len()
        )));
    }

    Ok(data)
}
