//! `GVOL` volume container.
//!
//! Layout: the magic `GVOL`, a little-endian u32 version, a little-endian u32
//! header length, a JSON header with the grid metadata, then one
//! little-endian f32 per voxel in storage order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GlowError, GlowResult};
use crate::volume::{voxel_count, Volume};

pub const GVOL_MAGIC: &[u8; 4] = b"GVOL";
pub const GVOL_VERSION: u32 = 1;
pub const GVOL_EXTENSION: &str = "gvol";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VolumeHeader {
    dims: [u32; 3],
    spacing: [f64; 3],
    origin: [f64; 3],
    direction: [f64; 9],
}

pub fn read_volume(path: impl AsRef<Path>) -> GlowResult<Volume> {
    let data = std::fs::read(path.as_ref())?;
    decode_volume(&data)
}

pub fn write_volume(path: impl AsRef<Path>, volume: &Volume) -> GlowResult<()> {
    let data = encode_volume(volume)?;
    std::fs::write(path.as_ref(), data)?;
    Ok(())
}

pub fn encode_volume(volume: &Volume) -> GlowResult<Vec<u8>> {
    if voxel_count(volume.dims) != Some(volume.values.len()) {
        return Err(GlowError::format(format!(
            "volume has {} values for dims {:?}",
            volume.values.len(),
            volume.dims
        )));
    }
    let header = VolumeHeader {
        dims: volume.dims,
        spacing: volume.spacing,
        origin: volume.origin,
        direction: volume.direction,
    };
    let header = serde_json::to_vec(&header).map_err(|err| GlowError::format(err.to_string()))?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| GlowError::format("volume header is too large"))?;

    let mut data = Vec::with_capacity(12 + header.len() + volume.values.len() * 4);
    data.extend_from_slice(GVOL_MAGIC);
    data.extend_from_slice(&GVOL_VERSION.to_le_bytes());
    data.extend_from_slice(&header_len.to_le_bytes());
    data.extend_from_slice(&header);
    for value in &volume.values {
        data.extend_from_slice(&value.to_le_bytes());
    }
    Ok(data)
}

pub fn decode_volume(data: &[u8]) -> GlowResult<Volume> {
    let mut cursor = 0usize;
    let magic = take(data, &mut cursor, 4)?;
    if magic != GVOL_MAGIC {
        return Err(GlowError::format("missing GVOL magic"));
    }
    let version = read_u32_le(data, &mut cursor)?;
    if version != GVOL_VERSION {
        return Err(GlowError::format(format!(
            "unsupported GVOL version {version}"
        )));
    }
    let header_len = read_u32_le(data, &mut cursor)? as usize;
    let header_bytes = take(data, &mut cursor, header_len)?;
    let header: VolumeHeader = serde_json::from_slice(header_bytes)
        .map_err(|err| GlowError::format(format!("bad GVOL header: {err}")))?;

    let byte_len = voxel_count(header.dims)
        .and_then(|count| count.checked_mul(4))
        .ok_or_else(|| GlowError::format("GVOL dims overflow"))?;
    let payload = take(data, &mut cursor, byte_len)?;
    if cursor != data.len() {
        return Err(GlowError::format(format!(
            "{} trailing bytes after GVOL payload",
            data.len() - cursor
        )));
    }
    let values = payload
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(Volume {
        dims: header.dims,
        spacing: header.spacing,
        origin: header.origin,
        direction: header.direction,
        values,
    })
}

fn take<'a>(data: &'a [u8], cursor: &mut usize, len: usize) -> GlowResult<&'a [u8]> {
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| GlowError::format("GVOL data is truncated"))?;
    let slice = &data[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn read_u32_le(data: &[u8], cursor: &mut usize) -> GlowResult<u32> {
    let bytes = take(data, cursor, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
