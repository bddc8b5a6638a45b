//! FAT12/FAT16 disk image creation for PC emulators.
//!
//! A disk type (floppy template, hard disk template, or a custom hard disk
//! by size or CHS) is resolved into a geometry, sized into a FAT volume and
//! written out as MBR, boot sector, FAT heads and an optional label entry.

pub mod bpb;
pub mod device;
pub mod dir;
pub mod error;
pub mod fat;
pub mod fs;
pub mod geometry;
pub mod image;
pub mod layout;
pub mod mbr;

pub use crate::error::{Error, ErrorCode, Result, Warning};
pub use crate::fs::{FsOptions, FsSpec};
pub use crate::geometry::{DiskKind, Geometry};
pub use crate::image::{create_file, plan, write_image, write_image_with_serial, ImageRequest, ImageSpec, Plan};
