//! The subset of D3DFORMAT knowledge the trimmer needs: how many bytes a
//! locked surface region occupies.

const fn fourcc(code: &[u8; 4]) -> i32 {
    i32::from_le_bytes(*code)
}

/// Pixel formats observed in D3D9 capture streams. Unrecognised raw values
/// are carried through so they can be reported in diagnostics.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    R8G8B8,
    A8R8G8B8,
    X8R8G8B8,
    R5G6B5,
    X1R5G5B5,
    A1R5G5B5,
    A4R4G4B4,
    A8,
    A2B10G10R10,
    A8B8G8R8,
    G16R16,
    A16B16G16R16,
    L8,
    A8L8,
    L16,
    D16,
    D24S8,
    D24X8,
    D32,
    R16F,
    G16R16F,
    A16B16G16R16F,
    R32F,
    G32R32F,
    A32B32G32R32F,
    Dxt1,
    Dxt2,
    Dxt3,
    Dxt4,
    Dxt5,
    Unknown(i32),
}

impl Format {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            20 => Format::R8G8B8,
            21 => Format::A8R8G8B8,
            22 => Format::X8R8G8B8,
            23 => Format::R5G6B5,
            24 => Format::X1R5G5B5,
            25 => Format::A1R5G5B5,
            26 => Format::A4R4G4B4,
            28 => Format::A8,
            31 => Format::A2B10G10R10,
            32 => Format::A8B8G8R8,
            34 => Format::G16R16,
            36 => Format::A16B16G16R16,
            50 => Format::L8,
            51 => Format::A8L8,
            81 => Format::L16,
            80 => Format::D16,
            75 => Format::D24S8,
            77 => Format::D24X8,
            71 => Format::D32,
            111 => Format::R16F,
            112 => Format::G16R16F,
            113 => Format::A16B16G16R16F,
            114 => Format::R32F,
            115 => Format::G32R32F,
            116 => Format::A32B32G32R32F,
            _ if raw == fourcc(b"DXT1") => Format::Dxt1,
            _ if raw == fourcc(b"DXT2") => Format::Dxt2,
            _ if raw == fourcc(b"DXT3") => Format::Dxt3,
            _ if raw == fourcc(b"DXT4") => Format::Dxt4,
            _ if raw == fourcc(b"DXT5") => Format::Dxt5,
            other => Format::Unknown(other),
        }
    }

    /// Block-compressed formats lock four texel rows at a time.
    pub fn is_block_compressed(&self) -> bool {
        matches!(
            self,
            Format::Dxt1 | Format::Dxt2 | Format::Dxt3 | Format::Dxt4 | Format::Dxt5
        )
    }

    /// Bytes occupied by one locked row of `width` texels. The DXTn
    /// formats lay out 4x4 texel blocks, 8 bytes per DXT1 block and 16
    /// otherwise, so their row is a block row.
    pub fn row_size(&self, width: u32) -> u64 {
        let width = width as u64;
        let blocks = width.div_ceil(4);
        match self {
            Format::Dxt1 => blocks * 8,
            Format::Dxt2 | Format::Dxt3 | Format::Dxt4 | Format::Dxt5 => blocks * 16,
            Format::A8 | Format::L8 => width,
            Format::R5G6B5
            | Format::X1R5G5B5
            | Format::A1R5G5B5
            | Format::A4R4G4B4
            | Format::A8L8
            | Format::L16
            | Format::D16
            | Format::R16F => width * 2,
            Format::R8G8B8 => width * 3,
            Format::A16B16G16R16 | Format::A16B16G16R16F | Format::G32R32F => width * 8,
            Format::A32B32G32R32F => width * 16,
            // Everything else, unknown formats included, locks as 32bpp.
            _ => width * 4,
        }
    }
}

/// Byte length of a locked surface region. A zero pitch falls back to the
/// format's natural row size for `width`.
pub fn get_lock_size(format: Format, width: u32, height: u32, pitch: u32) -> u64 {
    if width == 0 || height == 0 {
        return 0;
    }
    let pitch = if pitch != 0 {
        pitch as u64
    } else {
        format.row_size(width)
    };
    let rows = if format.is_block_compressed() {
        (height as u64).div_ceil(4)
    } else {
        height as u64
    };
    rows * pitch
}
