//! DDS container with DXT1/DXT5 block compression.

use bytemuck::{Pod, Zeroable};

use super::{CpuTexture, TextureError};

const MAGIC: &[u8; 4] = b"DDS ";
const HEADER_SIZE: u32 = 124;
const DATA_OFFSET: usize = 4 + HEADER_SIZE as usize;

const FLAG_CAPS: u32 = 0x1;
const FLAG_PIXELFORMAT: u32 = 0x1000;
const FLAG_LINEARSIZE: u32 = 0x80000;
const REQUIRED_FLAGS: u32 = FLAG_CAPS | FLAG_PIXELFORMAT | FLAG_LINEARSIZE;

const PIXEL_FOURCC: u32 = 0x4;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[allow(dead_code)]
struct PixelFormat {
    size: u32,
    flags: u32,
    four_cc: [u8; 4],
    rgb_bit_count: u32,
    r_mask: u32,
    g_mask: u32,
    b_mask: u32,
    a_mask: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[allow(dead_code)]
struct Header {
    size: u32,
    flags: u32,
    height: u32,
    width: u32,
    linear_size: u32,
    depth: u32,
    mip_map_count: u32,
    reserved1: [u32; 11],
    pixel_format: PixelFormat,
    caps: u32,
    caps2: u32,
    caps3: u32,
    caps4: u32,
    reserved2: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Codec {
    Bc1,
    Bc3,
}

impl Codec {
    fn block_size(self) -> usize {
        match self {
            Codec::Bc1 => 8,
            Codec::Bc3 => 16,
        }
    }
}

/// Whether `data` starts with the DDS magic.
pub fn is_dds(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Validate a DDS header and decompress the top mip level to RGBA8.
pub fn decode(data: &[u8]) -> Result<CpuTexture, TextureError> {
    if !is_dds(data) {
        return Err(TextureError::InvalidHeader("missing DDS magic"));
    }
    let header_bytes = data
        .get(4..DATA_OFFSET)
        .ok_or(TextureError::Truncated {
            expected: DATA_OFFSET,
            actual: data.len(),
        })?;
    let header: Header = bytemuck::try_pod_read_unaligned(header_bytes)
        .map_err(|_| TextureError::InvalidHeader("unreadable header"))?;

    if header.size != HEADER_SIZE {
        return Err(TextureError::InvalidHeader("unexpected header size"));
    }
    if header.flags & REQUIRED_FLAGS != REQUIRED_FLAGS {
        return Err(TextureError::InvalidHeader("missing required flags"));
    }
    let payload = &data[DATA_OFFSET..];
    if header.linear_size as usize > payload.len() {
        return Err(TextureError::Truncated {
            expected: header.linear_size as usize,
            actual: payload.len(),
        });
    }
    if header.pixel_format.flags & PIXEL_FOURCC == 0 {
        return Err(TextureError::Unsupported("uncompressed".into()));
    }
    let codec = match &header.pixel_format.four_cc {
        b"DXT1" => Codec::Bc1,
        b"DXT5" => Codec::Bc3,
        other => return Err(TextureError::Unsupported(String::from_utf8_lossy(other).into_owned())),
    };
    if header.width == 0 || header.height == 0 {
        return Err(TextureError::InvalidHeader("empty image"));
    }

    let width = header.width as usize;
    let height = header.height as usize;
    let blocks_x = width.div_ceil(4);
    let blocks_y = height.div_ceil(4);
    let needed = blocks_x
        .checked_mul(blocks_y)
        .and_then(|n| n.checked_mul(codec.block_size()))
        .ok_or(TextureError::InvalidHeader("image too large"))?;
    let rgba_size = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or(TextureError::InvalidHeader("image too large"))?;
    if payload.len() < needed {
        return Err(TextureError::Truncated {
            expected: needed,
            actual: payload.len(),
        });
    }

    let mut rgba = vec![0u8; rgba_size];
    for (i, block) in payload[..needed].chunks_exact(codec.block_size()).enumerate() {
        let texels = match codec {
            Codec::Bc1 => decode_color_block(block, true),
            Codec::Bc3 => {
                let mut texels = decode_color_block(&block[8..], false);
                let alpha = decode_alpha_block(&block[..8]);
                for (t, a) in texels.iter_mut().zip(alpha) {
                    t[3] = a;
                }
                texels
            }
        };

        let bx = (i % blocks_x) * 4;
        let by = (i / blocks_x) * 4;
        for (j, texel) in texels.iter().enumerate() {
            let x = bx + j % 4;
            let y = by + j / 4;
            if x < width && y < height {
                let at = (y * width + x) * 4;
                rgba[at..at + 4].copy_from_slice(texel);
            }
        }
    }

    Ok(CpuTexture::new(header.width, header.height, rgba))
}

fn expand_565(c: u16) -> [u8; 3] {
    let r = ((c >> 11) & 0x1f) as u8;
    let g = ((c >> 5) & 0x3f) as u8;
    let b = (c & 0x1f) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

fn mix(a: u8, b: u8, wa: u16, wb: u16) -> u8 {
    ((a as u16 * wa + b as u16 * wb) / (wa + wb)) as u8
}

/// Decode an 8-byte color block into 16 RGBA texels.
///
/// `allow_punch_through` enables the 3-color + transparent mode used by
/// DXT1 when the first endpoint is not greater than the second.
fn decode_color_block(block: &[u8], allow_punch_through: bool) -> [[u8; 4]; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let [r0, g0, b0] = expand_565(c0);
    let [r1, g1, b1] = expand_565(c1);

    let mut palette = [[r0, g0, b0, 255], [r1, g1, b1, 255], [0; 4], [0; 4]];
    if c0 > c1 || !allow_punch_through {
        palette[2] = [mix(r0, r1, 2, 1), mix(g0, g1, 2, 1), mix(b0, b1, 2, 1), 255];
        palette[3] = [mix(r0, r1, 1, 2), mix(g0, g1, 1, 2), mix(b0, b1, 1, 2), 255];
    } else {
        palette[2] = [mix(r0, r1, 1, 1), mix(g0, g1, 1, 1), mix(b0, b1, 1, 1), 255];
    }

    let bits = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    std::array::from_fn(|i| palette[((bits >> (2 * i)) & 0x3) as usize])
}

/// Decode an 8-byte BC3 alpha block into 16 alpha values.
fn decode_alpha_block(block: &[u8]) -> [u8; 16] {
    let a0 = block[0];
    let a1 = block[1];
    let mut palette = [0u8; 8];
    palette[0] = a0;
    palette[1] = a1;
    if a0 > a1 {
        for i in 1..7u16 {
            palette[i as usize + 1] = mix(a0, a1, 7 - i, i);
        }
    } else {
        for i in 1..5u16 {
            palette[i as usize + 1] = mix(a0, a1, 5 - i, i);
        }
        palette[6] = 0;
        palette[7] = 255;
    }

    let mut bits = 0u64;
    for (i, &b) in block[2..8].iter().enumerate() {
        bits |= (b as u64) << (8 * i);
    }
    std::array::from_fn(|i| palette[((bits >> (3 * i)) & 0x7) as usize])
}
