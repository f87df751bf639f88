//! 44 byte RIFF/WAVE header codec
//!
//! Pure byte layout, no I/O. The recorder writes `encode_header(format, 0)`
//! when a stream starts and patches it with `derive_final_header` once the
//! file size is known.
//!
//! Layout (little-endian):
//! - 0..4   "RIFF"
//! - 4..8   36 + payload length
//! - 8..12  "WAVE"
//! - 12..16 "fmt "
//! - 16..20 fmt chunk size (16)
//! - 20..22 format code (1 = PCM)
//! - 22..24 channels
//! - 24..28 sample rate
//! - 28..32 byte rate
//! - 32..34 block align
//! - 34..36 bits per sample
//! - 36..40 "data"
//! - 40..44 payload length

use super::format::AudioFormatParams;
use crate::error::{RecorderError, Result};

pub const HEADER_LEN: usize = 44;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_MAGIC: &[u8; 4] = b"WAVE";
const FMT_MAGIC: &[u8; 4] = b"fmt ";
const DATA_MAGIC: &[u8; 4] = b"data";
const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// Bytes between the RIFF size field and the payload
const RIFF_SIZE_BASE: u32 = 36;

/// Decoded header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: AudioFormatParams,
    /// Value of the RIFF chunk size field (file size - 8)
    pub riff_size: u32,
    /// Value of the data chunk size field
    pub payload_len: u32,
}

/// Build the header for a payload of `payload_len` bytes
pub fn encode_header(format: &AudioFormatParams, payload_len: u64) -> Result<[u8; HEADER_LEN]> {
    let data_len = u32::try_from(payload_len)
        .ok()
        .filter(|len| len.checked_add(RIFF_SIZE_BASE).is_some())
        .ok_or(RecorderError::FormatOverflow { payload_len })?;

    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(RIFF_MAGIC);
    header[4..8].copy_from_slice(&(RIFF_SIZE_BASE + data_len).to_le_bytes());
    header[8..12].copy_from_slice(WAVE_MAGIC);

    header[12..16].copy_from_slice(FMT_MAGIC);
    header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    header[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels().to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate().to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample().to_le_bytes());

    header[36..40].copy_from_slice(DATA_MAGIC);
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    Ok(header)
}

/// Build the final header from the size of the file on disk
pub fn derive_final_header(
    format: &AudioFormatParams,
    total_file_size: u64,
) -> Result<[u8; HEADER_LEN]> {
    let payload_len = total_file_size
        .checked_sub(HEADER_LEN as u64)
        .ok_or(RecorderError::InvalidFileSize {
            size: total_file_size,
        })?;
    encode_header(format, payload_len)
}

/// Parse and validate a header produced by this codec
pub fn decode_header(bytes: &[u8]) -> Result<WavHeader> {
    if bytes.len() < HEADER_LEN {
        return Err(RecorderError::MalformedHeader(format!(
            "need {HEADER_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    expect_magic(bytes, 0, RIFF_MAGIC)?;
    expect_magic(bytes, 8, WAVE_MAGIC)?;
    expect_magic(bytes, 12, FMT_MAGIC)?;
    expect_magic(bytes, 36, DATA_MAGIC)?;

    let fmt_len = read_u32(bytes, 16);
    if fmt_len != FMT_CHUNK_LEN {
        return Err(RecorderError::MalformedHeader(format!(
            "fmt chunk is {fmt_len} bytes, expected {FMT_CHUNK_LEN}"
        )));
    }
    let format_code = read_u16(bytes, 20);
    if format_code != FORMAT_PCM {
        return Err(RecorderError::MalformedHeader(format!(
            "format code {format_code} is not PCM"
        )));
    }

    let format = AudioFormatParams::new(
        read_u32(bytes, 24),
        read_u16(bytes, 22),
        read_u16(bytes, 34),
    )
    .map_err(|e| RecorderError::MalformedHeader(e.to_string()))?;

    // derived fields must agree with the base fields
    let byte_rate = read_u32(bytes, 28);
    let block_align = read_u16(bytes, 32);
    if byte_rate != format.byte_rate() || block_align != format.block_align() {
        return Err(RecorderError::MalformedHeader(format!(
            "byte rate {byte_rate} / block align {block_align} disagree with {format:?}"
        )));
    }

    Ok(WavHeader {
        format,
        riff_size: read_u32(bytes, 4),
        payload_len: read_u32(bytes, 40),
    })
}

fn expect_magic(bytes: &[u8], offset: usize, magic: &[u8; 4]) -> Result<()> {
    if &bytes[offset..offset + 4] == magic {
        Ok(())
    } else {
        Err(RecorderError::MalformedHeader(format!(
            "expected {:?} at offset {offset}",
            String::from_utf8_lossy(magic)
        )))
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
