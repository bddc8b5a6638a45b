//! Disk geometry resolution: named templates and custom hard disks.

use crate::error::{Error, GeometryFault, Result, Warning};

/// Legacy CHS limits for hard disks.
pub const MAX_CYLINDERS: u32 = 1023;
pub const MAX_HEADS: u32 = 65;
pub const MAX_SECTORS: u32 = 63;

/// Smallest disk a filesystem is built on, in sectors (3 MiB).
pub const MIN_DISK_SECTORS: u64 = 6144;

/// Custom size bounds in MiB.
pub const MIN_SIZE_MIB: u32 = 3;
pub const MAX_SIZE_MIB: u32 = 2014;

/// Media descriptor of a fixed disk.
pub const MEDIA_HARD_DISK: u8 = 0xF8;
/// Default root directory entries on hard disks.
pub const HARD_DISK_ROOT_ENTRIES: u16 = 512;

/// Keyword selecting a custom hard disk.
pub const CUSTOM_HARD_DISK: &str = "hd";

const SECTORS_PER_MIB: u64 = 2048;

/// Cylinder/head/sector triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub cylinders: u16,
    pub heads: u8,
    pub sectors: u8,
}

impl Geometry {
    pub const fn new(cylinders: u16, heads: u8, sectors: u8) -> Self {
        Self {
            cylinders,
            heads,
            sectors,
        }
    }

    /// Total number of 512-byte sectors.
    pub fn total_sectors(&self) -> u32 {
        self.cylinders as u32 * self.heads as u32 * self.sectors as u32
    }

    pub fn size_bytes(&self) -> u64 {
        self.total_sectors() as u64 * 512
    }

    /// Whole MiB covered by this geometry, rounded down.
    pub fn size_mib(&self) -> u32 {
        (self.total_sectors() as u64 / SECTORS_PER_MIB) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskKind {
    Floppy,
    HardDisk,
}

/// A resolved disk: geometry plus the defaults its kind implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskProfile {
    pub geometry: Geometry,
    pub kind: DiskKind,
    pub media_descriptor: u8,
    pub root_entries: u16,
    pub warnings: Vec<Warning>,
}

impl DiskProfile {
    pub fn hard_disk(geometry: Geometry) -> Self {
        Self {
            geometry,
            kind: DiskKind::HardDisk,
            media_descriptor: MEDIA_HARD_DISK,
            root_entries: HARD_DISK_ROOT_ENTRIES,
            warnings: Vec::new(),
        }
    }

    pub fn is_hard_disk(&self) -> bool {
        self.kind == DiskKind::HardDisk
    }
}

struct Template {
    names: &'static [&'static str],
    geometry: Geometry,
    kind: DiskKind,
    media_descriptor: u8,
    root_entries: u16,
}

const fn floppy(names: &'static [&'static str], c: u16, h: u8, s: u8, media: u8, root: u16) -> Template {
    Template {
        names,
        geometry: Geometry::new(c, h, s),
        kind: DiskKind::Floppy,
        media_descriptor: media,
        root_entries: root,
    }
}

const fn hard(names: &'static [&'static str], c: u16, h: u8, s: u8) -> Template {
    Template {
        names,
        geometry: Geometry::new(c, h, s),
        kind: DiskKind::HardDisk,
        media_descriptor: MEDIA_HARD_DISK,
        root_entries: HARD_DISK_ROOT_ENTRIES,
    }
}

static TEMPLATES: &[Template] = &[
    floppy(&["fd_160"], 40, 1, 8, 0xFE, 56),
    floppy(&["fd_180"], 40, 1, 9, 0xFC, 56),
    floppy(&["fd_200"], 40, 1, 10, 0xFC, 56),
    floppy(&["fd_320"], 40, 2, 8, 0xFF, 112),
    floppy(&["fd_360"], 40, 2, 9, 0xFD, 112),
    floppy(&["fd_400"], 40, 2, 10, 0xFD, 112),
    floppy(&["fd_720"], 80, 2, 9, 0xF9, 112),
    floppy(&["fd_1200"], 80, 2, 15, 0xF9, 224),
    floppy(&["fd_1440", "fd", "floppy"], 80, 2, 18, 0xF0, 224),
    floppy(&["fd_2880"], 80, 2, 36, 0xF0, 512),
    hard(&["hd_250"], 489, 16, 63),
    hard(&["hd_520"], 1023, 16, 63),
    hard(&["hd_1gig"], 1023, 32, 63),
    hard(&["hd_2gig"], 1023, 64, 63),
    // geometry of old Seagate drives
    hard(&["hd_st251"], 820, 6, 17),
    hard(&["hd_st225"], 615, 4, 17),
];

/// Names accepted by [`resolve`], in table order, followed by the custom keyword.
pub fn template_names() -> impl Iterator<Item = &'static str> {
    TEMPLATES
        .iter()
        .flat_map(|t| t.names.iter().copied())
        .chain(core::iter::once(CUSTOM_HARD_DISK))
}

/// Resolve a disk type name into a profile.
///
/// `size_mib` wins over `chs` when both are given; either is only consulted
/// for the custom hard disk keyword.
pub fn resolve(type_name: &str, size_mib: Option<u32>, chs: Option<(u32, u32, u32)>) -> Result<DiskProfile> {
    if let Some(t) = TEMPLATES
        .iter()
        .find(|t| t.names.iter().any(|n| n.eq_ignore_ascii_case(type_name)))
    {
        return Ok(DiskProfile {
            geometry: t.geometry,
            kind: t.kind,
            media_descriptor: t.media_descriptor,
            root_entries: t.root_entries,
            warnings: Vec::new(),
        });
    }

    if !type_name.eq_ignore_ascii_case(CUSTOM_HARD_DISK) {
        return Err(Error::InvalidType(type_name.to_owned()));
    }

    match (size_mib, chs) {
        (Some(size), _) => from_size(size),
        (None, Some((c, h, s))) => from_chs(c, h, s).map(DiskProfile::hard_disk),
        (None, None) => Err(Error::MissingSizeOrGeometry),
    }
}

/// Pick a CHS triple for a hard disk of roughly `size_mib` MiB.
pub fn from_size(size_mib: u32) -> Result<DiskProfile> {
    if !(MIN_SIZE_MIB..=MAX_SIZE_MIB).contains(&size_mib) {
        return Err(Error::InvalidSize(size_mib));
    }
    let target = size_mib as u64 * SECTORS_PER_MIB;
    let cyl_max = MAX_CYLINDERS as u64;

    let mut heads: u64 = 2;
    while heads * MAX_SECTORS as u64 * cyl_max < target {
        heads <<= 1;
    }
    let heads = heads.min(MAX_HEADS as u64);

    let mut sectors: u64 = 8;
    while heads * sectors * cyl_max < target {
        sectors <<= 1;
    }
    let sectors = sectors.min(MAX_SECTORS as u64);

    let cylinders = (target / (heads * sectors)).min(cyl_max);

    let geometry = Geometry::new(cylinders as u16, heads as u8, sectors as u8);
    let mut profile = DiskProfile::hard_disk(geometry);

    let effective = geometry.size_mib();
    if effective != size_mib {
        let warning = Warning::SizeRounded {
            requested_mib: size_mib,
            effective_mib: effective,
        };
        tracing::warn!("{}", warning);
        profile.warnings.push(warning);
    }
    tracing::debug!(
        size_mib,
        cylinders,
        heads,
        sectors,
        "resolved custom hard disk geometry"
    );
    Ok(profile)
}

/// Validate an explicit CHS triple.
pub fn from_chs(cylinders: u32, heads: u32, sectors: u32) -> Result<Geometry> {
    if !(1..=MAX_CYLINDERS).contains(&cylinders) {
        return Err(Error::InvalidGeometry(GeometryFault::Cylinders(cylinders)));
    }
    if !(1..=MAX_HEADS).contains(&heads) {
        return Err(Error::InvalidGeometry(GeometryFault::Heads(heads)));
    }
    if !(1..=MAX_SECTORS).contains(&sectors) {
        return Err(Error::InvalidGeometry(GeometryFault::Sectors(sectors)));
    }
    let total = cylinders as u64 * heads as u64 * sectors as u64;
    if total < MIN_DISK_SECTORS {
        return Err(Error::InvalidGeometry(GeometryFault::TooSmall(total)));
    }
    Ok(Geometry::new(cylinders as u16, heads as u8, sectors as u8))
}
