//! CRC-32/MPEG-2 used by long-form sections.

use crc::{Crc, CRC_32_MPEG_2};

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Compute the CRC-32/MPEG-2 checksum of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    CRC.checksum(data)
}
