//! Errors and warnings for image planning and writing.

use core::fmt;
use std::io;
use std::path::PathBuf;

/// Result alias used by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Stable exit codes, one per failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    InvalidUsage = 1,
    InvalidFatType = 2,
    InvalidFatCopies = 3,
    InvalidSpc = 4,
    InvalidRootDir = 5,
    InvalidSize = 6,
    InvalidChs = 7,
    InvalidType = 8,
    FileError = 9,
    InvalidFatSize = 10,
    InvalidClusters = 11,
}

impl ErrorCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Which geometry axis (or combination) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFault {
    Cylinders(u32),
    Heads(u32),
    Sectors(u32),
    /// Total capacity in sectors is below 3 MiB.
    TooSmall(u64),
}

/// On-disk structure being written when an I/O error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    Mbr,
    BootSector,
    Fat(u8),
    LabelEntry,
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Structure::Mbr => f.write_str("MBR"),
            Structure::BootSector => f.write_str("boot sector"),
            Structure::Fat(n) => write!(f, "FAT #{}", n),
            Structure::LabelEntry => f.write_str("filesystem entry for volume label"),
        }
    }
}

/// Errors returned while resolving, sizing or writing an image.
#[derive(Debug)]
pub enum Error {
    /// Disk type name is neither a template nor the custom keyword.
    InvalidType(String),
    /// Custom hard disk requested without a size or a full CHS triple.
    MissingSizeOrGeometry,
    /// Size in MiB outside 3..=2014.
    InvalidSize(u32),
    InvalidGeometry(GeometryFault),
    /// FAT width other than 12 or 16.
    UnsupportedFatType(u32),
    /// FAT12 explicitly requested on a volume of this many sectors.
    TooLargeForFat12(u32),
    InvalidFatCopies(u32),
    SpcOutOfRange(u32),
    SpcNotPowerOfTwo(u32),
    InvalidRootDir(u32),
    /// Sectors per FAT above 65536.
    FatTooLarge(u32),
    TooFewClusters { clusters: i64, min: i64 },
    TooManyClusters { clusters: i64, max: i64 },
    /// The image file could not be opened for writing.
    Create { path: PathBuf, source: io::Error },
    /// The image could not be extended to its final length.
    InsufficientSpace { bytes: u64, source: io::Error },
    Io { structure: Structure, source: io::Error },
}

impl Error {
    /// Exit code family for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidType(_) | Error::MissingSizeOrGeometry => ErrorCode::InvalidType,
            Error::InvalidSize(_) => ErrorCode::InvalidSize,
            Error::InvalidGeometry(_) => ErrorCode::InvalidChs,
            Error::UnsupportedFatType(_) | Error::TooLargeForFat12(_) => ErrorCode::InvalidFatType,
            Error::InvalidFatCopies(_) => ErrorCode::InvalidFatCopies,
            Error::SpcOutOfRange(_) | Error::SpcNotPowerOfTwo(_) => ErrorCode::InvalidSpc,
            Error::InvalidRootDir(_) => ErrorCode::InvalidRootDir,
            Error::FatTooLarge(_) => ErrorCode::InvalidFatSize,
            Error::TooFewClusters { .. } | Error::TooManyClusters { .. } => {
                ErrorCode::InvalidClusters
            }
            Error::Create { .. } | Error::InsufficientSpace { .. } | Error::Io { .. } => {
                ErrorCode::FileError
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidType(name) => write!(f, "invalid disk type \"{}\"", name),
            Error::MissingSizeOrGeometry => {
                f.write_str("a size or a full CHS geometry is required for type \"hd\"")
            }
            Error::InvalidSize(mib) => {
                write!(f, "invalid size {} MiB, must be between 3 and 2014 MiB", mib)
            }
            Error::InvalidGeometry(GeometryFault::Cylinders(c)) => {
                write!(f, "invalid CHS: cylinders must be between 1 and 1023 (got {})", c)
            }
            Error::InvalidGeometry(GeometryFault::Heads(h)) => {
                write!(f, "invalid CHS: heads must be between 1 and 65 (got {})", h)
            }
            Error::InvalidGeometry(GeometryFault::Sectors(s)) => {
                write!(f, "invalid CHS: sectors must be between 1 and 63 (got {})", s)
            }
            Error::InvalidGeometry(GeometryFault::TooSmall(total)) => write!(
                f,
                "invalid CHS: geometry specifies a disk smaller than 3 MiB ({} sectors)",
                total
            ),
            Error::UnsupportedFatType(t) => write!(f, "invalid FAT type {}, must be 12 or 16", t),
            Error::TooLargeForFat12(sectors) => {
                write!(f, "volume of {} sectors is too large for FAT12", sectors)
            }
            Error::InvalidFatCopies(n) => {
                write!(f, "invalid FAT copies {}, must be between 1 and 4", n)
            }
            Error::SpcOutOfRange(n) => {
                write!(f, "invalid sectors per cluster {}, must be between 1 and 128", n)
            }
            Error::SpcNotPowerOfTwo(n) => {
                write!(f, "invalid sectors per cluster {}, must be a power of 2", n)
            }
            Error::InvalidRootDir(n) => {
                write!(f, "invalid root directory entries {}, must be between 1 and 4096", n)
            }
            Error::FatTooLarge(sectors) => write!(
                f,
                "generated filesystem has {} sectors per FAT, more than 65536",
                sectors
            ),
            Error::TooFewClusters { clusters, min } => write!(
                f,
                "generated filesystem has too few clusters ({}, minimum {})",
                clusters, min
            ),
            Error::TooManyClusters { clusters, max } => write!(
                f,
                "cluster count {} is too high for the volume (maximum {})",
                clusters, max
            ),
            Error::Create { path, source } => write!(
                f,
                "the file \"{}\" cannot be opened for writing: {}",
                path.display(),
                source
            ),
            Error::InsufficientSpace { bytes, source } => write!(
                f,
                "not enough space available for the image file, need {} bytes: {}",
                bytes, source
            ),
            Error::Io { structure, source } => {
                write!(f, "unable to write image file {}: {}", structure, source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Create { source, .. }
            | Error::InsufficientSpace { source, .. }
            | Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Non-fatal conditions noticed while planning an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// CHS quantization moved the capacity away from the requested size.
    SizeRounded { requested_mib: u32, effective_mib: u32 },
    /// Label longer than 11 bytes was cut.
    LabelTruncated { original_len: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SizeRounded { effective_mib, .. } => {
                write!(f, "effective image size will be {} MiB", effective_mib)
            }
            Warning::LabelTruncated { .. } => {
                f.write_str("provided label is too long, truncating to 11 characters")
            }
        }
    }
}
