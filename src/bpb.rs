//! FAT12/16 boot sector and BIOS parameter block.

use crate::dir::NO_NAME;
use crate::fat::{FatType, RESERVED_SECTORS};
use crate::fs::FsSpec;
use crate::geometry::{Geometry, MEDIA_HARD_DISK};
use crate::layout::{Sector, SECTOR_SIZE};

/// Field offsets within the boot sector.
mod offset {
    pub const JUMP: usize = 0x000;
    pub const OEM_NAME: usize = 0x003;
    pub const BYTES_PER_SECTOR: usize = 0x00B;
    pub const SECTORS_PER_CLUSTER: usize = 0x00D;
    pub const RESERVED_SECTORS: usize = 0x00E;
    pub const NUM_FATS: usize = 0x010;
    pub const ROOT_ENTRIES: usize = 0x011;
    pub const TOTAL_SECTORS_16: usize = 0x013;
    pub const MEDIA: usize = 0x015;
    pub const FAT_SIZE_16: usize = 0x016;
    pub const SECTORS_PER_TRACK: usize = 0x018;
    pub const NUM_HEADS: usize = 0x01A;
    pub const HIDDEN_SECTORS: usize = 0x01C;
    pub const TOTAL_SECTORS_32: usize = 0x020;
    pub const DRIVE_NUMBER: usize = 0x024;
    pub const BOOT_SIGNATURE: usize = 0x026;
    pub const VOLUME_ID: usize = 0x027;
    pub const VOLUME_LABEL: usize = 0x02B;
    pub const FS_TYPE: usize = 0x036;
}

pub const SERIAL_OFFSET: usize = offset::VOLUME_ID;

const JUMP: [u8; 3] = [0xEB, 0x3C, 0x90];
const OEM_NAME: &[u8; 8] = b"MSDOS5.0";
const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
const DRIVE_FLOPPY: u8 = 0x00;
const DRIVE_HARD_DISK: u8 = 0x80;

/// Build the boot sector for `fs` on a disk of `geometry`.
pub fn build(geometry: &Geometry, fs: &FsSpec, serial: u32) -> Sector {
    let mut s = Sector::zeroed();
    s.put_bytes(offset::JUMP, &JUMP)
        .put_bytes(offset::OEM_NAME, OEM_NAME)
        .put_u16(offset::BYTES_PER_SECTOR, SECTOR_SIZE as u16)
        .put_u8(offset::SECTORS_PER_CLUSTER, fs.sectors_per_cluster)
        .put_u16(offset::RESERVED_SECTORS, RESERVED_SECTORS as u16)
        .put_u8(offset::NUM_FATS, fs.fat_copies)
        .put_u16(offset::ROOT_ENTRIES, fs.root_entries);

    match u16::try_from(fs.volume_size) {
        Ok(small) => s.put_u16(offset::TOTAL_SECTORS_16, small),
        Err(_) => s.put_u32(offset::TOTAL_SECTORS_32, fs.volume_size),
    };

    // sizing never lets a FAT grow past 65536 sectors; the 16-bit field
    // wraps only at exactly that bound
    s.put_u8(offset::MEDIA, fs.media_descriptor)
        .put_u16(offset::FAT_SIZE_16, fs.fat_size as u16)
        .put_u16(offset::SECTORS_PER_TRACK, geometry.sectors as u16)
        .put_u16(offset::NUM_HEADS, geometry.heads as u16)
        .put_u32(offset::HIDDEN_SECTORS, fs.volume_offset);

    let drive = if fs.media_descriptor == MEDIA_HARD_DISK {
        DRIVE_HARD_DISK
    } else {
        DRIVE_FLOPPY
    };
    s.put_u8(offset::DRIVE_NUMBER, drive)
        .put_u8(offset::BOOT_SIGNATURE, EXTENDED_BOOT_SIGNATURE)
        .put_u32(offset::VOLUME_ID, serial);

    match &fs.label {
        Some(label) => s.put_padded(offset::VOLUME_LABEL, 11, label.as_bytes()),
        None => s.put_bytes(offset::VOLUME_LABEL, NO_NAME),
    };

    s.put_bytes(offset::FS_TYPE, fs.fat_type.label()).put_signature();
    s
}

/// BPB fields as read back from a boot sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bpb {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    /// Whichever of the 16- and 32-bit fields is in use.
    pub total_sectors: u32,
    pub media: u8,
    pub fat_size: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub drive_number: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fat_type: Option<FatType>,
}

/// Why a sector could not be read as a FAT12/16 boot sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    MissingSignature,
    BadSectorSize(u16),
    NoExtendedSignature,
}

impl Bpb {
    pub fn parse(s: &Sector) -> Result<Self, ParseError> {
        if !s.has_signature() {
            return Err(ParseError::MissingSignature);
        }
        let bytes_per_sector = s.u16_at(offset::BYTES_PER_SECTOR);
        if bytes_per_sector as usize != SECTOR_SIZE {
            return Err(ParseError::BadSectorSize(bytes_per_sector));
        }
        if s.u8_at(offset::BOOT_SIGNATURE) != EXTENDED_BOOT_SIGNATURE {
            return Err(ParseError::NoExtendedSignature);
        }

        let total_16 = s.u16_at(offset::TOTAL_SECTORS_16);
        let total_sectors = if total_16 != 0 {
            total_16 as u32
        } else {
            s.u32_at(offset::TOTAL_SECTORS_32)
        };

        let bytes = s.as_bytes();
        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&bytes[offset::VOLUME_LABEL..offset::VOLUME_LABEL + 11]);
        let fs_type = &bytes[offset::FS_TYPE..offset::FS_TYPE + 8];
        let fat_type = [FatType::Fat12, FatType::Fat16]
            .into_iter()
            .find(|t| t.label() == fs_type);

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster: s.u8_at(offset::SECTORS_PER_CLUSTER),
            reserved_sectors: s.u16_at(offset::RESERVED_SECTORS),
            num_fats: s.u8_at(offset::NUM_FATS),
            root_entries: s.u16_at(offset::ROOT_ENTRIES),
            total_sectors,
            media: s.u8_at(offset::MEDIA),
            fat_size: s.u16_at(offset::FAT_SIZE_16),
            sectors_per_track: s.u16_at(offset::SECTORS_PER_TRACK),
            num_heads: s.u16_at(offset::NUM_HEADS),
            hidden_sectors: s.u32_at(offset::HIDDEN_SECTORS),
            drive_number: s.u8_at(offset::DRIVE_NUMBER),
            volume_id: s.u32_at(offset::VOLUME_ID),
            volume_label,
            fat_type,
        })
    }

    /// Cluster count a FAT driver would compute from these fields, or `None`
    /// when the metadata overruns the volume or clusters are zero-sized.
    pub fn cluster_count(&self) -> Option<u32> {
        let root_dir = (self.root_entries as u32 * 32 + 511) / 512;
        let meta = self.reserved_sectors as u32 + self.num_fats as u32 * self.fat_size as u32 + root_dir;
        self.total_sectors
            .checked_sub(meta)?
            .checked_div(self.sectors_per_cluster as u32)
    }
}
