use crate::path::StreamPath;
use crate::wire::{AttrTag, CommandKind, STREAM_MAGIC, UUID_LEN};

use crate::decode::command_crc;

/// Produces well-formed send-stream bytes. This is the fixture side of
/// the decoder: tests and tooling describe a command sequence and get
/// back a buffer with a valid envelope, framing and checksums.
pub struct StreamBuilder {
    buf: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::with_version(1)
    }

    pub fn with_version(version: u32) -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(STREAM_MAGIC);
        buf.extend_from_slice(&version.to_le_bytes());
        Self { buf }
    }

    pub fn subvol(&mut self, path: impl Into<StreamPath>, uuid: [u8; UUID_LEN], ctransid: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_uuid(&mut region, AttrTag::Uuid, uuid);
        put_u64(&mut region, AttrTag::Ctransid, ctransid);
        self.emit(CommandKind::Subvol.code(), &region)
    }

    pub fn snapshot(&mut self, path: impl Into<StreamPath>, uuid: [u8; UUID_LEN], ctransid: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_uuid(&mut region, AttrTag::Uuid, uuid);
        put_u64(&mut region, AttrTag::Ctransid, ctransid);
        self.emit(CommandKind::Snapshot.code(), &region)
    }

    pub fn mkfile(&mut self, path: impl Into<StreamPath>, ino: u64) -> &mut Self {
        self.create(CommandKind::Mkfile, path, ino)
    }

    pub fn mkdir(&mut self, path: impl Into<StreamPath>, ino: u64) -> &mut Self {
        self.create(CommandKind::Mkdir, path, ino)
    }

    pub fn mkfifo(&mut self, path: impl Into<StreamPath>, ino: u64) -> &mut Self {
        self.create(CommandKind::Mkfifo, path, ino)
    }

    pub fn mksock(&mut self, path: impl Into<StreamPath>, ino: u64) -> &mut Self {
        self.create(CommandKind::Mksock, path, ino)
    }

    pub fn mknod(&mut self, path: impl Into<StreamPath>, ino: u64, mode: u64, rdev: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::Ino, ino);
        put_u64(&mut region, AttrTag::Mode, mode);
        put_u64(&mut region, AttrTag::Rdev, rdev);
        self.emit(CommandKind::Mknod.code(), &region)
    }

    pub fn symlink(
        &mut self,
        path: impl Into<StreamPath>,
        ino: u64,
        target: impl Into<StreamPath>,
    ) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::Ino, ino);
        put_bytes(&mut region, AttrTag::PathLink, target.into().as_bytes());
        self.emit(CommandKind::Symlink.code(), &region)
    }

    pub fn rename(&mut self, from: impl Into<StreamPath>, to: impl Into<StreamPath>) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, from.into().as_bytes());
        put_bytes(&mut region, AttrTag::PathTo, to.into().as_bytes());
        self.emit(CommandKind::Rename.code(), &region)
    }

    pub fn link(&mut self, path: impl Into<StreamPath>, existing: impl Into<StreamPath>) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_bytes(&mut region, AttrTag::PathLink, existing.into().as_bytes());
        self.emit(CommandKind::Link.code(), &region)
    }

    pub fn unlink(&mut self, path: impl Into<StreamPath>) -> &mut Self {
        self.path_only(CommandKind::Unlink, path)
    }

    pub fn rmdir(&mut self, path: impl Into<StreamPath>) -> &mut Self {
        self.path_only(CommandKind::Rmdir, path)
    }

    pub fn write(&mut self, path: impl Into<StreamPath>, offset: u64, data: &[u8]) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::FileOffset, offset);
        put_bytes(&mut region, AttrTag::Data, data);
        self.emit(CommandKind::Write.code(), &region)
    }

    pub fn update_extent(&mut self, path: impl Into<StreamPath>, offset: u64, size: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::FileOffset, offset);
        put_u64(&mut region, AttrTag::Size, size);
        self.emit(CommandKind::UpdateExtent.code(), &region)
    }

    pub fn truncate(&mut self, path: impl Into<StreamPath>, size: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::Size, size);
        self.emit(CommandKind::Truncate.code(), &region)
    }

    pub fn clone_range(
        &mut self,
        path: impl Into<StreamPath>,
        offset: u64,
        len: u64,
        src: impl Into<StreamPath>,
    ) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::FileOffset, offset);
        put_u64(&mut region, AttrTag::CloneLen, len);
        put_bytes(&mut region, AttrTag::ClonePath, src.into().as_bytes());
        put_u64(&mut region, AttrTag::CloneOffset, 0);
        self.emit(CommandKind::Clone.code(), &region)
    }

    pub fn chmod(&mut self, path: impl Into<StreamPath>, mode: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::Mode, mode);
        self.emit(CommandKind::Chmod.code(), &region)
    }

    pub fn chown(&mut self, path: impl Into<StreamPath>, uid: u64, gid: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::Uid, uid);
        put_u64(&mut region, AttrTag::Gid, gid);
        self.emit(CommandKind::Chown.code(), &region)
    }

    pub fn utimes(&mut self, path: impl Into<StreamPath>, secs: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_timespec(&mut region, AttrTag::Atime, secs);
        put_timespec(&mut region, AttrTag::Mtime, secs);
        put_timespec(&mut region, AttrTag::Ctime, secs);
        self.emit(CommandKind::Utimes.code(), &region)
    }

    pub fn set_xattr(&mut self, path: impl Into<StreamPath>, name: &[u8], data: &[u8]) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_bytes(&mut region, AttrTag::XattrName, name);
        put_bytes(&mut region, AttrTag::XattrData, data);
        self.emit(CommandKind::SetXattr.code(), &region)
    }

    pub fn remove_xattr(&mut self, path: impl Into<StreamPath>, name: &[u8]) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_bytes(&mut region, AttrTag::XattrName, name);
        self.emit(CommandKind::RemoveXattr.code(), &region)
    }

    /// Emit an arbitrary command with pre-encoded TLV triples, without
    /// duplicate-tag checks. Escape hatch for malformed-input fixtures.
    pub fn raw_command(&mut self, code: u16, attrs: &[(u16, &[u8])]) -> &mut Self {
        let mut region = Vec::new();
        for (tag, payload) in attrs {
            put_raw(&mut region, *tag, payload);
        }
        self.emit(code, &region)
    }

    /// Append the `end` command and hand back the finished buffer.
    pub fn finish(mut self) -> Vec<u8> {
        self.emit(CommandKind::End.code(), &[]);
        self.buf
    }

    /// The buffer without an `end` command, for truncation fixtures.
    pub fn finish_without_end(self) -> Vec<u8> {
        self.buf
    }

    fn create(&mut self, kind: CommandKind, path: impl Into<StreamPath>, ino: u64) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        put_u64(&mut region, AttrTag::Ino, ino);
        self.emit(kind.code(), &region)
    }

    fn path_only(&mut self, kind: CommandKind, path: impl Into<StreamPath>) -> &mut Self {
        let mut region = Vec::new();
        put_bytes(&mut region, AttrTag::Path, path.into().as_bytes());
        self.emit(kind.code(), &region)
    }

    fn emit(&mut self, code: u16, region: &[u8]) -> &mut Self {
        let crc = command_crc(region.len() as u32, code, region);
        self.buf.extend_from_slice(&(region.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(&code.to_le_bytes());
        self.buf.extend_from_slice(&crc.to_le_bytes());
        self.buf.extend_from_slice(region);
        self
    }
}

impl Default for StreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn put_raw(out: &mut Vec<u8>, tag: u16, payload: &[u8]) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
}

fn put_bytes(out: &mut Vec<u8>, tag: AttrTag, payload: &[u8]) {
    put_raw(out, tag.code(), payload);
}

fn put_u64(out: &mut Vec<u8>, tag: AttrTag, value: u64) {
    put_raw(out, tag.code(), &value.to_le_bytes());
}

fn put_uuid(out: &mut Vec<u8>, tag: AttrTag, value: [u8; UUID_LEN]) {
    put_raw(out, tag.code(), &value);
}

fn put_timespec(out: &mut Vec<u8>, tag: AttrTag, secs: u64) {
    let mut payload = [0u8; 12];
    payload[..8].copy_from_slice(&secs.to_le_bytes());
    put_raw(out, tag.code(), &payload);
}
