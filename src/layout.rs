//! Fixed-offset binary layout for 512-byte sectors.
//!
//! Every on-disk structure in this crate is built by placing little-endian
//! integers and padded strings at named offsets inside a [`Sector`].

use byteorder::{ByteOrder, LittleEndian};

/// Bytes per sector. Fixed for every image this crate produces.
pub const SECTOR_SIZE: usize = 512;

/// Offset of the `0x55 0xAA` signature shared by the MBR and boot sector.
pub const SIGNATURE_OFFSET: usize = 0x1FE;
pub const SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// One sector worth of bytes with typed writers.
#[derive(Clone, PartialEq, Eq)]
pub struct Sector([u8; SECTOR_SIZE]);

impl Sector {
    pub fn zeroed() -> Self {
        Self([0; SECTOR_SIZE])
    }

    pub fn from_template(template: &[u8; SECTOR_SIZE]) -> Self {
        Self(*template)
    }

    pub fn put_u8(&mut self, offset: usize, value: u8) -> &mut Self {
        self.0[offset] = value;
        self
    }

    pub fn put_u16(&mut self, offset: usize, value: u16) -> &mut Self {
        LittleEndian::write_u16(&mut self.0[offset..offset + 2], value);
        self
    }

    pub fn put_u32(&mut self, offset: usize, value: u32) -> &mut Self {
        LittleEndian::write_u32(&mut self.0[offset..offset + 4], value);
        self
    }

    pub fn put_bytes(&mut self, offset: usize, bytes: &[u8]) -> &mut Self {
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Copies `text` into a `width`-byte field, filling the rest with spaces.
    /// Input longer than the field is cut at `width`.
    pub fn put_padded(&mut self, offset: usize, width: usize, text: &[u8]) -> &mut Self {
        let field = &mut self.0[offset..offset + width];
        let n = text.len().min(width);
        field[..n].copy_from_slice(&text[..n]);
        field[n..].fill(b' ');
        self
    }

    pub fn put_signature(&mut self) -> &mut Self {
        self.put_bytes(SIGNATURE_OFFSET, &SIGNATURE)
    }

    pub fn u8_at(&self, offset: usize) -> u8 {
        self.0[offset]
    }

    pub fn u16_at(&self, offset: usize) -> u16 {
        LittleEndian::read_u16(&self.0[offset..offset + 2])
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        LittleEndian::read_u32(&self.0[offset..offset + 4])
    }

    pub fn has_signature(&self) -> bool {
        self.0[SIGNATURE_OFFSET..] == SIGNATURE
    }

    pub fn as_bytes(&self) -> &[u8; SECTOR_SIZE] {
        &self.0
    }

    /// Borrow a sector-sized slice out of a larger image buffer.
    pub fn read_from(image: &[u8], lba: u64) -> Option<Self> {
        let start = usize::try_from(lba).ok()?.checked_mul(SECTOR_SIZE)?;
        let bytes = image.get(start..start + SECTOR_SIZE)?;
        let mut buf = [0u8; SECTOR_SIZE];
        buf.copy_from_slice(bytes);
        Some(Self(buf))
    }
}

impl core::fmt::Debug for Sector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sector")
            .field("signature", &self.has_signature())
            .finish_non_exhaustive()
    }
}
