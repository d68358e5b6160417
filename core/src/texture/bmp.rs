//! Color table extraction from palettized BMP files.
//!
//! The `image` crate expands palettized bitmaps to RGBA, which loses the
//! color table that render modes operate on. This reads it back from the
//! file header.

const FILE_HEADER_SIZE: usize = 14;
const CORE_HEADER_SIZE: u32 = 12;
const INFO_HEADER_SIZE: u32 = 40;

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(data.get(at..at + 2)?.try_into().ok()?))
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(data.get(at..at + 4)?.try_into().ok()?))
}

/// Color table of a BMP with 8 or fewer bits per pixel, as RGB triples.
///
/// Returns `None` for truecolor bitmaps and for anything that is not a
/// well-formed BMP.
pub fn color_table(data: &[u8]) -> Option<Vec<[u8; 3]>> {
    if data.get(..2)? != b"BM" {
        return None;
    }
    let dib_size = read_u32(data, FILE_HEADER_SIZE)?;
    let (bits, used, entry_size) = if dib_size == CORE_HEADER_SIZE {
        (read_u16(data, FILE_HEADER_SIZE + 10)?, 0, 3)
    } else if dib_size >= INFO_HEADER_SIZE {
        (
            read_u16(data, FILE_HEADER_SIZE + 14)?,
            read_u32(data, FILE_HEADER_SIZE + 32)?,
            4,
        )
    } else {
        return None;
    };
    if bits == 0 || bits > 8 {
        return None;
    }

    let max_entries = 1usize << bits;
    let count = match used as usize {
        0 => max_entries,
        n => n.min(max_entries),
    };
    let start = FILE_HEADER_SIZE + dib_size as usize;
    let table = data.get(start..start + count * entry_size)?;
    Some(
        table
            .chunks_exact(entry_size)
            .map(|bgr| [bgr[2], bgr[1], bgr[0]])
            .collect(),
    )
}
