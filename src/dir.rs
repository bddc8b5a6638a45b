//! Volume label and its root directory entry.

use crate::error::Warning;

/// Width of an 8.3 short name (8 + 3), also the label width.
pub const SHORT_NAME_LEN: usize = 11;
/// Bytes written for a label entry: name plus attribute byte.
pub const LABEL_ENTRY_LEN: usize = 12;

pub const ATTR_VOLUME_ID: u8 = 0x08;

/// Label placed in the BPB when none was given.
pub const NO_NAME: &[u8; SHORT_NAME_LEN] = b"NO NAME    ";

/// Volume label bytes, at most 11.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    text: [u8; SHORT_NAME_LEN],
    len: usize,
}

impl Label {
    /// Copy `bytes` unchanged, cutting them to 11. The second value is set
    /// when they had to be cut.
    pub fn new(bytes: &[u8]) -> (Self, Option<Warning>) {
        let len = bytes.len().min(SHORT_NAME_LEN);
        let mut buf = [0u8; SHORT_NAME_LEN];
        buf[..len].copy_from_slice(&bytes[..len]);

        let warning = (bytes.len() > SHORT_NAME_LEN).then(|| Warning::LabelTruncated {
            original_len: bytes.len(),
        });
        (Self { text: buf, len }, warning)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.text[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The 11-byte on-disk form, space padded.
    pub fn padded(&self) -> [u8; SHORT_NAME_LEN] {
        let mut out = [b' '; SHORT_NAME_LEN];
        out[..self.len].copy_from_slice(self.as_bytes());
        out
    }
}

/// Build the short directory entry marking the volume label.
pub fn build_volume_label(label: &Label) -> [u8; LABEL_ENTRY_LEN] {
    let mut rec = [0u8; LABEL_ENTRY_LEN];
    rec[..SHORT_NAME_LEN].copy_from_slice(&label.padded());
    rec[SHORT_NAME_LEN] = ATTR_VOLUME_ID;
    rec
}

/// Name and attribute of a 32-byte short directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub raw_name: [u8; SHORT_NAME_LEN],
    pub attr: u8,
}

impl DirEntry {
    /// `None` marks the end of the directory.
    pub fn parse(rec: &[u8; 32]) -> Option<Self> {
        if rec[0] == 0x00 {
            return None;
        }
        let mut raw_name = [0u8; SHORT_NAME_LEN];
        raw_name.copy_from_slice(&rec[..SHORT_NAME_LEN]);
        Some(Self {
            raw_name,
            attr: rec[SHORT_NAME_LEN],
        })
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0
    }
}
