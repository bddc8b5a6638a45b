//! Filesystem sizing: turns a resolved disk into a consistent FAT12/16
//! parameter set, or rejects it.

use crate::dir::Label;
use crate::error::{Error, Result, Warning};
use crate::fat::{self, FatType, FAT12_VOLUME_LIMIT, RESERVED_SECTORS};
use crate::geometry::DiskProfile;

pub const DEFAULT_FAT_COPIES: u8 = 2;
pub const MAX_FAT_COPIES: u32 = 4;
pub const MAX_SPC: u32 = 128;
pub const MAX_ROOT_ENTRIES: u32 = 4096;

const DIR_ENTRY_SIZE: u32 = 32;

/// Filesystem overrides. `None` everywhere means "pick defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsOptions {
    /// Leave the image unformatted.
    pub blank: bool,
    pub fat_type: Option<u32>,
    pub sectors_per_cluster: Option<u32>,
    pub fat_copies: Option<u32>,
    pub root_entries: Option<u32>,
    /// Raw label bytes, cut to 11.
    pub label: Option<Vec<u8>>,
}

/// Fully derived FAT volume parameters. Sector counts are 512-byte sectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsSpec {
    pub fat_type: FatType,
    pub sectors_per_cluster: u8,
    pub root_entries: u16,
    pub media_descriptor: u8,
    pub fat_copies: u8,
    pub fat_size: u32,
    /// First sector of the volume; non-zero only on hard disks.
    pub volume_offset: u32,
    pub volume_size: u32,
    pub label: Option<Label>,
}

impl FsSpec {
    pub fn root_dir_sectors(&self) -> u32 {
        root_dir_sectors(self.root_entries as u32)
    }

    /// Absolute sector of FAT copy `index`.
    pub fn fat_lba(&self, index: u8) -> u32 {
        self.volume_offset + RESERVED_SECTORS + self.fat_size * index as u32
    }

    /// Absolute sector of the root directory.
    pub fn root_dir_lba(&self) -> u32 {
        self.fat_lba(self.fat_copies)
    }

    /// Data clusters plus the two reserved indices.
    pub fn cluster_count(&self) -> i64 {
        cluster_count(
            self.volume_size,
            self.fat_size,
            self.fat_copies,
            self.root_entries as u32,
            self.sectors_per_cluster as u32,
        )
    }
}

fn root_dir_sectors(entries: u32) -> u32 {
    (entries * DIR_ENTRY_SIZE + 511) / 512
}

fn cluster_count(volume_size: u32, fat_size: u32, fat_copies: u8, root_entries: u32, spc: u32) -> i64 {
    let effective = volume_size as i64
        - RESERVED_SECTORS as i64
        - fat_size as i64 * fat_copies as i64
        - root_dir_sectors(root_entries) as i64;
    effective / spc as i64 + 2
}

/// Derive the filesystem for `disk`. Returns `None` for a blank image.
///
/// A truncated label is reported through `warnings`.
pub fn size(disk: &DiskProfile, opts: &FsOptions, warnings: &mut Vec<Warning>) -> Result<Option<FsSpec>> {
    if opts.blank {
        return Ok(None);
    }
    let total = disk.geometry.total_sectors();

    let label = opts.label.as_deref().map(|text| {
        let (label, warning) = Label::new(text);
        if let Some(w) = warning {
            tracing::warn!("{}", w);
            warnings.push(w);
        }
        label
    });

    // one track is left for the MBR on hard disks
    let volume_offset = if disk.is_hard_disk() {
        disk.geometry.sectors as u32
    } else {
        0
    };
    let volume_size = total - volume_offset;

    let fat_type = match opts.fat_type {
        Some(bits) => {
            let ty = FatType::from_bits(bits)?;
            if ty == FatType::Fat12 && volume_size >= FAT12_VOLUME_LIMIT {
                return Err(Error::TooLargeForFat12(volume_size));
            }
            ty
        }
        None => FatType::auto_for(volume_size),
    };
    let max_clusters = fat_type.max_clusters();

    let fat_copies = match opts.fat_copies {
        Some(n) if (1..=MAX_FAT_COPIES).contains(&n) => n as u8,
        Some(n) => return Err(Error::InvalidFatCopies(n)),
        None => DEFAULT_FAT_COPIES,
    };

    let mut spc = match opts.sectors_per_cluster {
        Some(n) if !(1..=MAX_SPC).contains(&n) => return Err(Error::SpcOutOfRange(n)),
        Some(n) if !n.is_power_of_two() => return Err(Error::SpcNotPowerOfTwo(n)),
        Some(n) => n,
        None if total >= 1_048_576 => 4,
        None if total >= 131_072 => 2,
        None => 1,
    };
    // grow just enough to stay within the type's addressable clusters;
    // this applies to an explicit value as well
    while volume_size as i64 >= spc as i64 * (max_clusters - 2) && spc < MAX_SPC {
        spc <<= 1;
    }

    let fat_size = fat_type.table_sectors(volume_size, spc);
    fat::check_fat_size(fat_size)?;

    // counted with the disk's default root directory; an override only
    // takes effect below
    let clusters = cluster_count(volume_size, fat_size, fat_copies, disk.root_entries as u32, spc);
    fat::check_cluster_count(fat_type, clusters)?;

    let root_entries = match opts.root_entries {
        Some(n) if (1..=MAX_ROOT_ENTRIES).contains(&n) => n as u16,
        Some(n) => return Err(Error::InvalidRootDir(n)),
        None => disk.root_entries,
    };

    tracing::debug!(
        fat = fat_type.bits(),
        spc,
        fat_size,
        fat_copies,
        clusters,
        volume_offset,
        volume_size,
        "sized filesystem"
    );

    Ok(Some(FsSpec {
        fat_type,
        sectors_per_cluster: spc as u8,
        root_entries,
        media_descriptor: disk.media_descriptor,
        fat_copies,
        fat_size,
        volume_offset,
        volume_size,
        label,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{self, DiskKind, Geometry};

    fn sized(disk: &DiskProfile, opts: &FsOptions) -> Result<FsSpec> {
        let mut warnings = Vec::new();
        size(disk, opts, &mut warnings).map(|fs| fs.expect("filesystem requested"))
    }

    fn floppy_of(geometry: Geometry) -> DiskProfile {
        DiskProfile {
            geometry,
            kind: DiskKind::Floppy,
            media_descriptor: 0xF0,
            root_entries: 512,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn standard_floppy() {
        let disk = geometry::resolve("fd", None, None).unwrap();
        let fs = sized(&disk, &FsOptions::default()).unwrap();
        assert_eq!(fs.fat_type, FatType::Fat12);
        assert_eq!(fs.sectors_per_cluster, 1);
        assert_eq!(fs.root_entries, 224);
        assert_eq!(fs.media_descriptor, 0xF0);
        assert_eq!(fs.fat_copies, 2);
        assert_eq!(fs.fat_size, 9);
        assert_eq!(fs.volume_offset, 0);
        assert_eq!(fs.volume_size, 2880);
        assert_eq!(fs.cluster_count(), 2849);
        assert!(fs.label.is_none());
    }

    #[test]
    fn custom_50_mib_hard_disk() {
        let disk = geometry::resolve("hd", Some(50), None).unwrap();
        let fs = sized(&disk, &FsOptions::default()).unwrap();
        assert_eq!(fs.fat_type, FatType::Fat16);
        assert_eq!(fs.volume_offset, 63);
        assert_eq!(fs.volume_size, 812 * 2 * 63 - 63);
        // 102249 sectors exceed 65524 clusters at spc 1
        assert_eq!(fs.sectors_per_cluster, 2);
        assert_eq!(fs.fat_size, 200);
        assert_eq!(fs.root_entries, 512);
        assert_eq!(fs.media_descriptor, 0xF8);
        assert_eq!(fs.cluster_count(), 50910);
    }

    #[test]
    fn blank_image_has_no_filesystem() {
        let disk = geometry::resolve("fd", None, None).unwrap();
        let opts = FsOptions {
            blank: true,
            fat_type: Some(99),
            ..FsOptions::default()
        };
        let mut warnings = Vec::new();
        assert_eq!(size(&disk, &opts, &mut warnings).unwrap(), None);
    }

    #[test]
    fn fat12_rejected_on_large_volume() {
        let disk = geometry::resolve("hd", Some(50), None).unwrap();
        let opts = FsOptions {
            fat_type: Some(12),
            sectors_per_cluster: Some(3),
            ..FsOptions::default()
        };
        assert!(matches!(sized(&disk, &opts), Err(Error::TooLargeForFat12(102249))));
    }

    #[test]
    fn unsupported_width() {
        let disk = geometry::resolve("fd", None, None).unwrap();
        let opts = FsOptions {
            fat_type: Some(32),
            ..FsOptions::default()
        };
        assert!(matches!(sized(&disk, &opts), Err(Error::UnsupportedFatType(32))));
    }

    #[test]
    fn fat_copies_range() {
        let disk = geometry::resolve("fd", None, None).unwrap();
        for bad in [0, 5] {
            let opts = FsOptions {
                fat_copies: Some(bad),
                ..FsOptions::default()
            };
            assert!(matches!(sized(&disk, &opts), Err(Error::InvalidFatCopies(n)) if n == bad));
        }
        let opts = FsOptions {
            fat_copies: Some(1),
            ..FsOptions::default()
        };
        assert_eq!(sized(&disk, &opts).unwrap().fat_copies, 1);
    }

    #[test]
    fn spc_validation() {
        let disk = geometry::resolve("fd", None, None).unwrap();
        let with = |spc| FsOptions {
            sectors_per_cluster: Some(spc),
            ..FsOptions::default()
        };
        assert!(matches!(sized(&disk, &with(0)), Err(Error::SpcOutOfRange(0))));
        assert!(matches!(sized(&disk, &with(256)), Err(Error::SpcOutOfRange(256))));
        assert!(matches!(sized(&disk, &with(3)), Err(Error::SpcNotPowerOfTwo(3))));
        assert_eq!(sized(&disk, &with(4)).unwrap().sectors_per_cluster, 4);
    }

    #[test]
    fn explicit_spc_grows_on_large_volume() {
        let disk = geometry::resolve("hd_2gig", None, None).unwrap();
        let opts = FsOptions {
            sectors_per_cluster: Some(1),
            ..FsOptions::default()
        };
        let fs = sized(&disk, &opts).unwrap();
        // 4124673 sectors need 64 sectors per cluster to stay under 65524 clusters
        assert_eq!(fs.sectors_per_cluster, 64);
        assert!(fs.cluster_count() <= FatType::Fat16.max_clusters());
    }

    #[test]
    fn default_spc_tiers() {
        let disk = geometry::resolve("hd_520", None, None).unwrap();
        let fs = sized(&disk, &FsOptions::default()).unwrap();
        assert_eq!(fs.fat_type, FatType::Fat16);
        // 1031184 total sectors: tier 2, grown to 16
        assert_eq!(fs.sectors_per_cluster, 16);
        let disk = geometry::resolve("hd_st225", None, None).unwrap();
        let fs = sized(&disk, &FsOptions::default()).unwrap();
        assert_eq!(fs.sectors_per_cluster, 1);
    }

    #[test]
    fn fat16_on_floppy_has_too_few_clusters() {
        let disk = geometry::resolve("fd", None, None).unwrap();
        let opts = FsOptions {
            fat_type: Some(16),
            ..FsOptions::default()
        };
        assert!(matches!(
            sized(&disk, &opts),
            Err(Error::TooFewClusters { clusters: 2843, min: 0x0FF6 })
        ));
    }

    #[test]
    fn root_entries_override() {
        let disk = geometry::resolve("fd_720", None, None).unwrap();
        let with = |n| FsOptions {
            root_entries: Some(n),
            ..FsOptions::default()
        };
        assert_eq!(sized(&disk, &with(64)).unwrap().root_entries, 64);
        assert!(matches!(sized(&disk, &with(0)), Err(Error::InvalidRootDir(0))));
        assert!(matches!(sized(&disk, &with(4097)), Err(Error::InvalidRootDir(4097))));
        assert_eq!(sized(&disk, &FsOptions::default()).unwrap().root_entries, 112);
    }

    #[test]
    fn root_entries_override_is_not_counted_in_cluster_check() {
        let disk = DiskProfile::hard_disk(geometry::from_chs(100, 4, 21).unwrap());
        let opts = FsOptions {
            fat_type: Some(16),
            sectors_per_cluster: Some(2),
            root_entries: Some(4096),
            ..FsOptions::default()
        };
        // 8379 sectors: with 512 entries (8379 - 1 - 34 - 32) / 2 + 2 = 4158
        // clusters pass the FAT16 minimum; 4096 entries alone would leave 4046
        let fs = sized(&disk, &opts).unwrap();
        assert_eq!(fs.root_entries, 4096);
        assert_eq!(fs.fat_size, 17);
        assert_eq!(fs.cluster_count(), 4046);
    }

    #[test]
    fn label_truncation_warns() {
        let disk = geometry::resolve("fd", None, None).unwrap();
        let opts = FsOptions {
            label: Some("A_VERY_LONG_LABEL".into()),
            ..FsOptions::default()
        };
        let mut warnings = Vec::new();
        let fs = size(&disk, &opts, &mut warnings).unwrap().unwrap();
        assert_eq!(fs.label.unwrap().as_bytes(), b"A_VERY_LONG");
        assert_eq!(warnings, vec![Warning::LabelTruncated { original_len: 17 }]);
    }

    #[test]
    fn auto_type_boundary() {
        // floppy-kind disks have no reserved track, so volume == total
        let at = floppy_of(Geometry::new(768, 2, 16));
        assert_eq!(at.geometry.total_sectors(), 24576);
        assert_eq!(sized(&at, &FsOptions::default()).unwrap().fat_type, FatType::Fat16);

        let below = floppy_of(Geometry::new(983, 1, 25));
        assert_eq!(below.geometry.total_sectors(), 24575);
        let fs = sized(&below, &FsOptions::default()).unwrap();
        assert_eq!(fs.fat_type, FatType::Fat12);
        assert_eq!(fs.sectors_per_cluster, 8);
    }

    #[test]
    fn sizing_is_deterministic() {
        let disk = geometry::resolve("hd", Some(300), None).unwrap();
        let opts = FsOptions {
            label: Some("SAME".into()),
            fat_copies: Some(3),
            ..FsOptions::default()
        };
        assert_eq!(sized(&disk, &opts).unwrap(), sized(&disk, &opts).unwrap());
    }

    #[test]
    fn every_template_sizes_within_cluster_bounds() {
        for name in geometry::template_names().filter(|n| *n != "hd") {
            let disk = geometry::resolve(name, None, None).unwrap();
            let fs = sized(&disk, &FsOptions::default()).unwrap();
            let clusters = fs.cluster_count();
            assert!(clusters >= fs.fat_type.min_clusters(), "{}", name);
            assert!(clusters <= fs.fat_type.max_clusters(), "{}", name);
        }
    }
}
