//! Master boot record with a single primary partition.

use crate::fat::FatType;
use crate::fs::FsSpec;
use crate::geometry::Geometry;
use crate::layout::{Sector, SECTOR_SIZE};

/// Offsets of the first partition table entry.
mod offset {
    pub const STATUS: usize = 0x1BE;
    pub const START_HEAD: usize = 0x1BF;
    pub const START_SECTOR: usize = 0x1C0;
    pub const START_CYLINDER: usize = 0x1C1;
    pub const TYPE: usize = 0x1C2;
    pub const END_HEAD: usize = 0x1C3;
    pub const END_SECTOR: usize = 0x1C4;
    pub const END_CYLINDER: usize = 0x1C5;
    pub const START_LBA: usize = 0x1C6;
    pub const SECTOR_COUNT: usize = 0x1CA;
}

pub const STATUS_ACTIVE: u8 = 0x80;

pub const TYPE_FAT12: u8 = 0x01;
pub const TYPE_FAT16_SMALL: u8 = 0x04;
pub const TYPE_FAT16: u8 = 0x06;

/// Disks with fewer sectors than this may use the small partition types.
const SMALL_DISK_SECTORS: u32 = 65536;

/// Blank MBR carrying the FreeDOS bootstrap loader and the boot signature.
pub static BOOTSTRAP: [u8; SECTOR_SIZE] = [
    0x33, 0xC0, 0x8E, 0xC0, 0x8E, 0xD8, 0x8E, 0xD0, 0xBC, 0x00, 0x7C, 0xFC, 0x8B, 0xF4, 0xBF, 0x00,
    0x06, 0xB9, 0x00, 0x01, 0xF2, 0xA5, 0xEA, 0x67, 0x06, 0x00, 0x00, 0x8B, 0xD5, 0x58, 0xA2, 0x4F,
    0x07, 0x3C, 0x35, 0x74, 0x23, 0xB4, 0x10, 0xF6, 0xE4, 0x05, 0xAE, 0x04, 0x8B, 0xF0, 0x80, 0x7C,
    0x04, 0x00, 0x74, 0x44, 0x80, 0x7C, 0x04, 0x05, 0x74, 0x3E, 0xC6, 0x04, 0x80, 0xE8, 0xDA, 0x00,
    0x8A, 0x74, 0x01, 0x8B, 0x4C, 0x02, 0xEB, 0x08, 0xE8, 0xCF, 0x00, 0xB9, 0x01, 0x00, 0x32, 0xD1,
    0xBB, 0x00, 0x7C, 0xB8, 0x01, 0x02, 0xCD, 0x13, 0x72, 0x1E, 0x81, 0xBF, 0xFE, 0x01, 0x55, 0xAA,
    0x75, 0x16, 0xEA, 0x00, 0x7C, 0x00, 0x00, 0x80, 0xFA, 0x81, 0x74, 0x02, 0xB2, 0x80, 0x8B, 0xEA,
    0x42, 0x80, 0xF2, 0xB3, 0x88, 0x16, 0x41, 0x07, 0xBF, 0xBE, 0x07, 0xB9, 0x04, 0x00, 0xC6, 0x06,
    0x34, 0x07, 0x31, 0x32, 0xF6, 0x88, 0x2D, 0x8A, 0x45, 0x04, 0x3C, 0x00, 0x74, 0x23, 0x3C, 0x05,
    0x74, 0x1F, 0xFE, 0xC6, 0xBE, 0x31, 0x07, 0xE8, 0x71, 0x00, 0xBE, 0x4F, 0x07, 0x46, 0x46, 0x8B,
    0x1C, 0x0A, 0xFF, 0x74, 0x05, 0x32, 0x7D, 0x04, 0x75, 0xF3, 0x8D, 0xB7, 0x7B, 0x07, 0xE8, 0x5A,
    0x00, 0x83, 0xC7, 0x10, 0xFE, 0x06, 0x34, 0x07, 0xE2, 0xCB, 0x80, 0x3E, 0x75, 0x04, 0x02, 0x74,
    0x0B, 0xBE, 0x42, 0x07, 0x0A, 0xF6, 0x75, 0x0A, 0xCD, 0x18, 0xEB, 0xAC, 0xBE, 0x31, 0x07, 0xE8,
    0x39, 0x00, 0xE8, 0x36, 0x00, 0x32, 0xE4, 0xCD, 0x1A, 0x8B, 0xDA, 0x83, 0xC3, 0x60, 0xB4, 0x01,
    0xCD, 0x16, 0xB4, 0x00, 0x75, 0x0B, 0xCD, 0x1A, 0x3B, 0xD3, 0x72, 0xF2, 0xA0, 0x4F, 0x07, 0xEB,
    0x0A, 0xCD, 0x16, 0x8A, 0xC4, 0x3C, 0x1C, 0x74, 0xF3, 0x04, 0xF6, 0x3C, 0x31, 0x72, 0xD6, 0x3C,
    0x35, 0x77, 0xD2, 0x50, 0xBE, 0x2F, 0x07, 0xBB, 0x1B, 0x06, 0x53, 0xFC, 0xAC, 0x50, 0x24, 0x7F,
    0xB4, 0x0E, 0xCD, 0x10, 0x58, 0xA8, 0x80, 0x74, 0xF2, 0xC3, 0x56, 0xB8, 0x01, 0x03, 0xBB, 0x00,
    0x06, 0xB9, 0x01, 0x00, 0x32, 0xF6, 0xCD, 0x13, 0x5E, 0xC6, 0x06, 0x4F, 0x07, 0x3F, 0xC3, 0x0D,
    0x8A, 0x0D, 0x0A, 0x46, 0x35, 0x20, 0x2E, 0x20, 0x2E, 0x20, 0x2E, 0xA0, 0x64, 0x69, 0x73, 0x6B,
    0x20, 0x32, 0x0D, 0x0A, 0x0A, 0x44, 0x65, 0x66, 0x61, 0x75, 0x6C, 0x74, 0x3A, 0x20, 0x46, 0x31,
    0xA0, 0x00, 0x01, 0x00, 0x04, 0x00, 0x06, 0x03, 0x07, 0x07, 0x0A, 0x0A, 0x63, 0x0E, 0x64, 0x0E,
    0x65, 0x14, 0x80, 0x19, 0x81, 0x19, 0x82, 0x19, 0x83, 0x1E, 0x93, 0x24, 0xA5, 0x2B, 0x9F, 0x2F,
    0x75, 0x33, 0x52, 0x33, 0xDB, 0x36, 0x40, 0x3B, 0xF2, 0x41, 0x00, 0x44, 0x6F, 0xF3, 0x48, 0x70,
    0x66, 0xF3, 0x4F, 0x73, 0xB2, 0x55, 0x6E, 0x69, 0xF8, 0x4E, 0x6F, 0x76, 0x65, 0x6C, 0xEC, 0x4D,
    0x69, 0x6E, 0x69, 0xF8, 0x4C, 0x69, 0x6E, 0x75, 0xF8, 0x41, 0x6D, 0x6F, 0x65, 0x62, 0xE1, 0x46,
    0x72, 0x65, 0x65, 0x42, 0x53, 0xC4, 0x42, 0x53, 0x44, 0xE9, 0x50, 0x63, 0x69, 0xF8, 0x43, 0x70,
    0xED, 0x56, 0x65, 0x6E, 0x69, 0xF8, 0x44, 0x6F, 0x73, 0x73, 0x65, 0xE3, 0x3F, 0xBF, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x55, 0xAA,
];

/// A CHS address as stored in a partition entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chs {
    pub cylinder: u16,
    pub head: u8,
    /// 1-based, 6 bits.
    pub sector: u8,
}

impl Chs {
    /// Pack into (head, sector | cylinder bits 8-9 in bits 6-7, cylinder bits 0-7).
    pub fn pack(self) -> [u8; 3] {
        [
            self.head,
            (self.sector & 0x3F) | ((self.cylinder >> 2) & 0xC0) as u8,
            (self.cylinder & 0xFF) as u8,
        ]
    }

    pub fn unpack(bytes: [u8; 3]) -> Self {
        Self {
            head: bytes[0],
            sector: bytes[1] & 0x3F,
            cylinder: (((bytes[1] & 0xC0) as u16) << 2) | bytes[2] as u16,
        }
    }
}

/// The single partition entry written to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    pub status: u8,
    pub start: Chs,
    pub partition_type: u8,
    pub end: Chs,
    pub start_lba: u32,
    pub sector_count: u32,
}

impl PartitionEntry {
    /// Active partition covering the whole disk after the first track.
    pub fn for_volume(geometry: &Geometry, fs: &FsSpec) -> Self {
        let partition_type = if geometry.total_sectors() < SMALL_DISK_SECTORS {
            match fs.fat_type {
                FatType::Fat12 => TYPE_FAT12,
                FatType::Fat16 => TYPE_FAT16_SMALL,
            }
        } else {
            TYPE_FAT16
        };
        Self {
            status: STATUS_ACTIVE,
            // head 0 holds the partition table, head 1 starts the partition
            start: Chs {
                cylinder: 0,
                head: 1,
                sector: 1,
            },
            partition_type,
            end: Chs {
                cylinder: geometry.cylinders - 1,
                head: geometry.heads - 1,
                sector: geometry.sectors,
            },
            start_lba: fs.volume_offset,
            sector_count: fs.volume_size,
        }
    }

    pub fn encode(&self, sector: &mut Sector) {
        let start = self.start.pack();
        let end = self.end.pack();
        sector
            .put_u8(offset::STATUS, self.status)
            .put_u8(offset::START_HEAD, start[0])
            .put_u8(offset::START_SECTOR, start[1])
            .put_u8(offset::START_CYLINDER, start[2])
            .put_u8(offset::TYPE, self.partition_type)
            .put_u8(offset::END_HEAD, end[0])
            .put_u8(offset::END_SECTOR, end[1])
            .put_u8(offset::END_CYLINDER, end[2])
            .put_u32(offset::START_LBA, self.start_lba)
            .put_u32(offset::SECTOR_COUNT, self.sector_count);
    }

    pub fn decode(sector: &Sector) -> Self {
        let chs_at = |at: usize| Chs::unpack([sector.u8_at(at), sector.u8_at(at + 1), sector.u8_at(at + 2)]);
        Self {
            status: sector.u8_at(offset::STATUS),
            start: chs_at(offset::START_HEAD),
            partition_type: sector.u8_at(offset::TYPE),
            end: chs_at(offset::END_HEAD),
            start_lba: sector.u32_at(offset::START_LBA),
            sector_count: sector.u32_at(offset::SECTOR_COUNT),
        }
    }

    /// Disk geometry implied by the end address.
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.end.cylinder + 1, self.end.head + 1, self.end.sector)
    }
}

/// Bootstrap code with the partition table filled in.
pub fn build(geometry: &Geometry, fs: &FsSpec) -> Sector {
    let mut sector = Sector::from_template(&BOOTSTRAP);
    PartitionEntry::for_volume(geometry, fs).encode(&mut sector);
    sector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{self, FsOptions};
    use crate::geometry;

    fn plan(name: &str, size: Option<u32>, chs: Option<(u32, u32, u32)>) -> (Geometry, FsSpec) {
        let disk = geometry::resolve(name, size, chs).unwrap();
        let fs = fs::size(&disk, &FsOptions::default(), &mut Vec::new())
            .unwrap()
            .unwrap();
        (disk.geometry, fs)
    }

    #[test]
    fn template_has_boot_signature() {
        assert!(Sector::from_template(&BOOTSTRAP).has_signature());
    }

    #[test]
    fn chs_packing_splits_cylinder() {
        let chs = Chs {
            cylinder: 1022,
            head: 63,
            sector: 63,
        };
        // 1022 = 0b11_1111_1110
        assert_eq!(chs.pack(), [63, 0xFF, 0xFE]);
        assert_eq!(Chs::unpack(chs.pack()), chs);
    }

    #[test]
    fn partition_entry_for_50_mib() {
        let (g, fs) = plan("hd", Some(50), None);
        let sector = build(&g, &fs);
        let b = sector.as_bytes();
        assert_eq!(b[0x1BE], 0x80);
        assert_eq!(&b[0x1BF..0x1C2], &[1, 1, 0]);
        assert_eq!(b[0x1C2], TYPE_FAT16);
        assert_eq!(b[0x1C3], 1);
        // cylinder 811 = 0x32B: high bits 0x300 -> 0xC0
        assert_eq!(b[0x1C4], 63 | 0xC0);
        assert_eq!(b[0x1C5], 0x2B);
        assert_eq!(&b[0x1C6..0x1CA], &63u32.to_le_bytes());
        assert_eq!(&b[0x1CA..0x1CE], &fs.volume_size.to_le_bytes());
        assert!(sector.has_signature());
        // boot code left alone
        assert_eq!(&b[..0x1BE], &BOOTSTRAP[..0x1BE]);
    }

    #[test]
    fn small_disk_partition_types() {
        let (g, fs) = plan("hd_st225", None, None);
        assert_eq!(PartitionEntry::for_volume(&g, &fs).partition_type, TYPE_FAT16_SMALL);

        let disk = geometry::resolve("hd", None, Some((200, 4, 17))).unwrap();
        let opts = FsOptions {
            fat_type: Some(12),
            ..FsOptions::default()
        };
        let fs = fs::size(&disk, &opts, &mut Vec::new()).unwrap().unwrap();
        assert_eq!(
            PartitionEntry::for_volume(&disk.geometry, &fs).partition_type,
            TYPE_FAT12
        );
    }

    #[test]
    fn geometry_round_trips_through_entry() {
        for (name, size, chs) in [
            ("hd", Some(50), None),
            ("hd", Some(2014), None),
            ("hd", None, Some((1023, 65, 63))),
            ("hd", None, Some((300, 1, 21))),
            ("hd_st251", None, None),
            ("hd_2gig", None, None),
        ] {
            let (g, fs) = plan(name, size, chs);
            let sector = build(&g, &fs);
            let entry = PartitionEntry::decode(&sector);
            assert_eq!(entry, PartitionEntry::for_volume(&g, &fs));
            assert_eq!(entry.geometry(), g);
            assert_eq!(entry.start_lba, g.sectors as u32);
            assert_eq!(entry.start_lba + entry.sector_count, g.total_sectors());
        }
    }
}
