//! On-wire constants for the btrfs send stream.
//!
//! Layout: a 17-byte envelope (13-byte magic including the trailing NUL,
//! then a little-endian u32 version), followed by commands until `end`.
//! Each command is a 10-byte header (u32 length of the attribute region,
//! u16 kind, u32 crc) and a region of TLV attributes (u16 tag, u16
//! length, payload). All integers are little-endian.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const STREAM_MAGIC: &[u8; 13] = b"btrfs-stream\0";

/// Magic plus version word.
pub const ENVELOPE_LEN: usize = STREAM_MAGIC.len() + 4;

/// Length, kind, crc.
pub const CMD_HEADER_LEN: usize = 10;

/// Tag plus length.
pub const TLV_HEADER_LEN: usize = 4;

pub const UUID_LEN: usize = 16;

/// Seconds (u64) plus nanoseconds (u32).
pub const TIMESPEC_LEN: usize = 12;

pub const SUPPORTED_VERSIONS: &[u32] = &[1, 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandKind {
    Subvol = 1,
    Snapshot = 2,
    Mkfile = 3,
    Mkdir = 4,
    Mknod = 5,
    Mkfifo = 6,
    Mksock = 7,
    Symlink = 8,
    Rename = 9,
    Link = 10,
    Unlink = 11,
    Rmdir = 12,
    SetXattr = 13,
    RemoveXattr = 14,
    Write = 15,
    Clone = 16,
    Truncate = 17,
    Chmod = 18,
    Chown = 19,
    Utimes = 20,
    End = 21,
    UpdateExtent = 22,
}

impl CommandKind {
    pub fn from_code(code: u16) -> Option<Self> {
        use CommandKind::*;
        Some(match code {
            1 => Subvol,
            2 => Snapshot,
            3 => Mkfile,
            4 => Mkdir,
            5 => Mknod,
            6 => Mkfifo,
            7 => Mksock,
            8 => Symlink,
            9 => Rename,
            10 => Link,
            11 => Unlink,
            12 => Rmdir,
            13 => SetXattr,
            14 => RemoveXattr,
            15 => Write,
            16 => Clone,
            17 => Truncate,
            18 => Chmod,
            19 => Chown,
            20 => Utimes,
            21 => End,
            22 => UpdateExtent,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        use CommandKind::*;
        match self {
            Subvol => "subvol",
            Snapshot => "snapshot",
            Mkfile => "mkfile",
            Mkdir => "mkdir",
            Mknod => "mknod",
            Mkfifo => "mkfifo",
            Mksock => "mksock",
            Symlink => "symlink",
            Rename => "rename",
            Link => "link",
            Unlink => "unlink",
            Rmdir => "rmdir",
            SetXattr => "set_xattr",
            RemoveXattr => "remove_xattr",
            Write => "write",
            Clone => "clone",
            Truncate => "truncate",
            Chmod => "chmod",
            Chown => "chown",
            Utimes => "utimes",
            End => "end",
            UpdateExtent => "update_extent",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for CommandKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for CommandKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        (1u16..=22)
            .filter_map(CommandKind::from_code)
            .find(|k| k.name() == name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown command name {name:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AttrTag {
    Uuid = 1,
    Ctransid = 2,
    Ino = 3,
    Size = 4,
    Mode = 5,
    Uid = 6,
    Gid = 7,
    Rdev = 8,
    Ctime = 9,
    Mtime = 10,
    Atime = 11,
    Otime = 12,
    XattrName = 13,
    XattrData = 14,
    Path = 15,
    PathTo = 16,
    PathLink = 17,
    FileOffset = 18,
    Data = 19,
    CloneUuid = 20,
    CloneCtransid = 21,
    ClonePath = 22,
    CloneOffset = 23,
    CloneLen = 24,
}

impl AttrTag {
    pub fn from_code(code: u16) -> Option<Self> {
        use AttrTag::*;
        Some(match code {
            1 => Uuid,
            2 => Ctransid,
            3 => Ino,
            4 => Size,
            5 => Mode,
            6 => Uid,
            7 => Gid,
            8 => Rdev,
            9 => Ctime,
            10 => Mtime,
            11 => Atime,
            12 => Otime,
            13 => XattrName,
            14 => XattrData,
            15 => Path,
            16 => PathTo,
            17 => PathLink,
            18 => FileOffset,
            19 => Data,
            20 => CloneUuid,
            21 => CloneCtransid,
            22 => ClonePath,
            23 => CloneOffset,
            24 => CloneLen,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        use AttrTag::*;
        match self {
            Uuid => "uuid",
            Ctransid => "ctransid",
            Ino => "ino",
            Size => "size",
            Mode => "mode",
            Uid => "uid",
            Gid => "gid",
            Rdev => "rdev",
            Ctime => "ctime",
            Mtime => "mtime",
            Atime => "atime",
            Otime => "otime",
            XattrName => "xattr_name",
            XattrData => "xattr_data",
            Path => "path",
            PathTo => "path_to",
            PathLink => "path_link",
            FileOffset => "file_offset",
            Data => "data",
            CloneUuid => "clone_uuid",
            CloneCtransid => "clone_ctransid",
            ClonePath => "clone_path",
            CloneOffset => "clone_offset",
            CloneLen => "clone_len",
        }
    }
}

impl fmt::Display for AttrTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
