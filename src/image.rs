//! Image planning and writing.
//!
//! [`plan`] runs geometry resolution and filesystem sizing; [`write_image`]
//! lays the result out on a sink. Both stop at the first error.

use std::fs::{remove_file, OpenOptions};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::device::ImageSink;
use crate::dir;
use crate::error::{Error, Result, Structure, Warning};
use crate::fs::{self as fat_fs, FsOptions, FsSpec};
use crate::geometry::{self, DiskKind, Geometry};
use crate::{bpb, mbr};

/// Everything a front end collects before an image can be planned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRequest {
    pub type_name: String,
    pub size_mib: Option<u32>,
    pub chs: Option<(u32, u32, u32)>,
    pub fs: FsOptions,
}

/// Fully resolved image description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub geometry: Geometry,
    pub kind: DiskKind,
    /// `None` for a blank image.
    pub fs: Option<FsSpec>,
}

impl ImageSpec {
    pub fn size_bytes(&self) -> u64 {
        self.geometry.size_bytes()
    }

    /// DOS drive letter an emulator mounts this image as.
    pub fn drive_letter(&self) -> char {
        match self.kind {
            DiskKind::Floppy => 'a',
            DiskKind::HardDisk => 'c',
        }
    }

    /// Emulator command that mounts the image with its geometry.
    pub fn mount_command(&self, filename: &str) -> String {
        format!(
            "imgmount {} {} -size 512,{},{},{}",
            self.drive_letter(),
            filename,
            self.geometry.cylinders,
            self.geometry.heads,
            self.geometry.sectors
        )
    }
}

/// A planned image and the warnings raised while planning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub image: ImageSpec,
    pub warnings: Vec<Warning>,
}

pub fn plan(request: &ImageRequest) -> Result<Plan> {
    let disk = geometry::resolve(&request.type_name, request.size_mib, request.chs)?;
    let mut warnings = disk.warnings.clone();
    let fs = fat_fs::size(&disk, &request.fs, &mut warnings)?;
    Ok(Plan {
        image: ImageSpec {
            geometry: disk.geometry,
            kind: disk.kind,
            fs,
        },
        warnings,
    })
}

/// Volume serial derived from the current time.
pub fn volume_serial() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Write `image` with a time-derived volume serial.
pub fn write_image<S: ImageSink>(image: &ImageSpec, sink: &mut S) -> Result<()> {
    write_image_with_serial(image, sink, volume_serial())
}

/// Write `image` to `sink`. The sink is never read; areas not written
/// stay zero from preallocation.
pub fn write_image_with_serial<S: ImageSink>(image: &ImageSpec, sink: &mut S, serial: u32) -> Result<()> {
    let bytes = image.size_bytes();
    sink.preallocate(bytes)
        .map_err(|source| Error::InsufficientSpace { bytes, source })?;

    let Some(fs) = &image.fs else {
        tracing::info!(bytes, "wrote blank image");
        return Ok(());
    };
    let g = &image.geometry;

    if image.kind == DiskKind::HardDisk {
        let sector = mbr::build(g, fs);
        sink.write_sector(0, sector.as_bytes())
            .map_err(|source| Error::Io { structure: Structure::Mbr, source })?;
        tracing::debug!(start = fs.volume_offset, sectors = fs.volume_size, "wrote MBR");
    }

    let boot = bpb::build(g, fs, serial);
    sink.write_sector(fs.volume_offset as u64, boot.as_bytes())
        .map_err(|source| Error::Io { structure: Structure::BootSector, source })?;

    let head = fs.fat_type.head_bytes(fs.media_descriptor);
    for copy in 0..fs.fat_copies {
        sink.write_sector(fs.fat_lba(copy) as u64, &head)
            .map_err(|source| Error::Io { structure: Structure::Fat(copy), source })?;
    }

    if let Some(label) = &fs.label {
        let entry = dir::build_volume_label(label);
        sink.write_sector(fs.root_dir_lba() as u64, &entry)
            .map_err(|source| Error::Io { structure: Structure::LabelEntry, source })?;
    }

    tracing::info!(
        fat = fs.fat_type.bits(),
        clusters = fs.cluster_count(),
        bytes,
        "wrote formatted image"
    );
    Ok(())
}

/// Create (or truncate) `path` and write `image` into it. A partially
/// written file is removed before the error is returned.
pub fn create_file(path: &Path, image: &ImageSpec) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| Error::Create {
            path: path.to_path_buf(),
            source,
        })?;

    let result = write_image(image, &mut file);
    drop(file);

    if let Err(err) = &result {
        tracing::error!("{}", err);
        if let Err(rm) = remove_file(path) {
            tracing::warn!("could not remove partial image {}: {}", path.display(), rm);
        }
    }
    result
}
