//! FAT12/FAT16 table helpers.

use core::fmt;

use crate::error::{Error, Result};

/// Reserved sectors before the first FAT (the boot sector).
pub const RESERVED_SECTORS: u32 = 1;

/// Largest FAT this crate will lay out, in sectors.
pub const MAX_FAT_SECTORS: u32 = 65536;

/// Volumes of at least this many sectors (12 MiB) default to FAT16.
pub const FAT16_AUTO_THRESHOLD: u32 = 24576;

/// FAT12 cannot be requested on volumes of this many sectors (32 MiB) or more.
pub const FAT12_VOLUME_LIMIT: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatType {
    Fat12,
    Fat16,
}

impl FatType {
    /// Map an explicit width (12 or 16).
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            12 => Ok(FatType::Fat12),
            16 => Ok(FatType::Fat16),
            other => Err(Error::UnsupportedFatType(other)),
        }
    }

    /// Width chosen when none is requested.
    pub fn auto_for(volume_sectors: u32) -> Self {
        if volume_sectors >= FAT16_AUTO_THRESHOLD {
            FatType::Fat16
        } else {
            FatType::Fat12
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            FatType::Fat12 => 12,
            FatType::Fat16 => 16,
        }
    }

    /// Highest cluster count the type can address.
    pub fn max_clusters(self) -> i64 {
        match self {
            FatType::Fat12 => 0x0FF6,
            FatType::Fat16 => 0xFFF6,
        }
    }

    /// Lowest cluster count before a driver would read the volume as the
    /// narrower type.
    pub fn min_clusters(self) -> i64 {
        match self {
            FatType::Fat12 => 0,
            FatType::Fat16 => 0x0FF6,
        }
    }

    /// `BS_FilSysType` string.
    pub fn label(self) -> &'static [u8; 8] {
        match self {
            FatType::Fat12 => b"FAT12   ",
            FatType::Fat16 => b"FAT16   ",
        }
    }

    /// Sectors needed by one FAT for a volume of `volume_sectors` at `spc`.
    pub fn table_sectors(self, volume_sectors: u32, spc: u32) -> u32 {
        let entries = (volume_sectors / spc) as u64;
        let bytes = match self {
            // 1.5 bytes per entry
            FatType::Fat12 => (entries + 1) * 3 / 2,
            FatType::Fat16 => entries * 2,
        };
        ((bytes + 511) / 512) as u32
    }

    /// The first bytes of every FAT copy: media descriptor in the low byte
    /// of entry 0, all other bits of entries 0 and 1 set.
    pub fn head_bytes(self, media_descriptor: u8) -> [u8; 4] {
        let value: u32 = match self {
            FatType::Fat12 => 0x00FF_FF00,
            FatType::Fat16 => 0xFFFF_FF00,
        } | media_descriptor as u32;
        value.to_le_bytes()
    }
}

impl fmt::Display for FatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FAT{}", self.bits())
    }
}

pub fn check_fat_size(sectors: u32) -> Result<()> {
    if sectors > MAX_FAT_SECTORS {
        return Err(Error::FatTooLarge(sectors));
    }
    Ok(())
}

pub fn check_cluster_count(ty: FatType, clusters: i64) -> Result<()> {
    if clusters < ty.min_clusters() {
        return Err(Error::TooFewClusters {
            clusters,
            min: ty.min_clusters(),
        });
    }
    if clusters > ty.max_clusters() {
        return Err(Error::TooManyClusters {
            clusters,
            max: ty.max_clusters(),
        });
    }
    Ok(())
}
