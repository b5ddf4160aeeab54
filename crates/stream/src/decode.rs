use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use smallvec::SmallVec;

use crate::error::StreamError;
use crate::path::StreamPath;
use crate::wire::{
    AttrTag, CMD_HEADER_LEN, CommandKind, ENVELOPE_LEN, STREAM_MAGIC, SUPPORTED_VERSIONS,
    TIMESPEC_LEN, TLV_HEADER_LEN, UUID_LEN,
};

/// Cooperative cancellation flag, checked between commands (never inside
/// one). Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A decoded attribute payload. The decoder types payloads by tag;
/// tags it does not know stay `Raw` so newer streams keep decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    U64(u64),
    Bytes(Vec<u8>),
    Timespec { secs: u64, nsecs: u32 },
    Uuid([u8; UUID_LEN]),
    Raw(Vec<u8>),
}

/// Attributes of one command, in wire order. Commands carry a handful of
/// attributes at most, so lookups are linear scans.
#[derive(Debug, Clone, Default)]
pub struct AttrMap {
    attrs: SmallVec<[(u16, AttrValue); 8]>,
}

impl AttrMap {
    fn insert(&mut self, tag: u16, value: AttrValue) -> bool {
        if self.attrs.iter().any(|(t, _)| *t == tag) {
            return false;
        }
        self.attrs.push((tag, value));
        true
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &AttrValue)> {
        self.attrs.iter().map(|(t, v)| (*t, v))
    }

    pub fn get(&self, tag: AttrTag) -> Option<&AttrValue> {
        let code = tag.code();
        self.attrs
            .iter()
            .find_map(|(t, v)| (*t == code).then_some(v))
    }

    pub fn u64(&self, tag: AttrTag) -> Option<u64> {
        match self.get(tag)? {
            AttrValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bytes(&self, tag: AttrTag) -> Option<&[u8]> {
        match self.get(tag)? {
            AttrValue::Bytes(b) | AttrValue::Raw(b) => Some(b),
            _ => None,
        }
    }

    pub fn path(&self, tag: AttrTag) -> Option<StreamPath> {
        self.bytes(tag).map(StreamPath::from)
    }
}

/// One decoded command. `kind` is `None` when the kind code is outside
/// the table; callers decide whether that is fatal.
#[derive(Debug, Clone)]
pub struct Command {
    pub code: u16,
    pub kind: Option<CommandKind>,
    pub attrs: AttrMap,
    /// Byte offset of the command header in the stream, for diagnostics.
    pub offset: usize,
}

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Verify the per-command checksum. Off by default.
    pub verify_crc: bool,
    /// Accepted envelope versions.
    pub supported_versions: Vec<u32>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_crc: false,
            supported_versions: SUPPORTED_VERSIONS.to_vec(),
        }
    }
}

/// Single forward pass over a send-stream buffer. Holds a cursor and
/// nothing else; decoded commands own their attribute payloads.
#[derive(Debug)]
pub struct StreamDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
    version: u32,
    verify_crc: bool,
    cancel: Option<CancelToken>,
    done: bool,
}

impl<'a> StreamDecoder<'a> {
    /// Validate the envelope and position the cursor at the first command.
    pub fn new(buf: &'a [u8], options: &DecodeOptions) -> Result<Self, StreamError> {
        if buf.len() < ENVELOPE_LEN {
            return Err(StreamError::malformed(0, "stream shorter than envelope"));
        }
        if &buf[..STREAM_MAGIC.len()] != STREAM_MAGIC {
            return Err(StreamError::malformed(0, "bad magic"));
        }
        let version = read_u32(buf, STREAM_MAGIC.len())
            .ok_or_else(|| StreamError::malformed(STREAM_MAGIC.len(), "missing version word"))?;
        if !options.supported_versions.contains(&version) {
            return Err(StreamError::UnsupportedVersion {
                got: version,
                supported: options.supported_versions.clone(),
            });
        }

        Ok(Self {
            buf,
            pos: ENVELOPE_LEN,
            version,
            verify_crc: options.verify_crc,
            cancel: None,
            done: false,
        })
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Decode the next command, or `None` once the `end` command has been
    /// consumed (bytes after it are ignored).
    pub fn next_command(&mut self) -> Result<Option<Command>, StreamError> {
        if self.done {
            return Ok(None);
        }
        if let Some(token) = &self.cancel
            && token.is_cancelled()
        {
            return Err(StreamError::Cancelled);
        }

        let offset = self.pos;
        if self.buf.len() - self.pos < CMD_HEADER_LEN {
            return Err(StreamError::Truncated { offset });
        }

        let region_len = read_u32(self.buf, offset).unwrap_or(0) as usize;
        let code = read_u16(self.buf, offset + 4).unwrap_or(0);
        let stored_crc = read_u32(self.buf, offset + 6).unwrap_or(0);

        let region_start = offset + CMD_HEADER_LEN;
        let region_end = region_start
            .checked_add(region_len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(StreamError::Truncated { offset })?;
        let region = &self.buf[region_start..region_end];

        if self.verify_crc {
            let computed = command_crc(region_len as u32, code, region);
            if computed != stored_crc {
                return Err(StreamError::CorruptCommand {
                    offset,
                    expected: stored_crc,
                    got: computed,
                });
            }
        }

        let attrs = decode_attrs(region, region_start)?;
        let kind = CommandKind::from_code(code);

        self.pos = region_end;
        if kind == Some(CommandKind::End) {
            self.done = true;
        }

        Ok(Some(Command {
            code,
            kind,
            attrs,
            offset,
        }))
    }
}

/// Checksum over the command header (crc field zeroed) plus the
/// attribute region.
pub fn command_crc(region_len: u32, code: u16, region: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&region_len.to_le_bytes());
    hasher.update(&code.to_le_bytes());
    hasher.update(&[0u8; 4]);
    hasher.update(region);
    hasher.finalize()
}

fn decode_attrs(region: &[u8], region_offset: usize) -> Result<AttrMap, StreamError> {
    let mut attrs = AttrMap::default();
    let mut pos = 0usize;

    while pos < region.len() {
        if region.len() - pos < TLV_HEADER_LEN {
            return Err(StreamError::malformed(
                region_offset + pos,
                "attribute header overruns command",
            ));
        }
        let tag = read_u16(region, pos).unwrap_or(0);
        let len = read_u16(region, pos + 2).unwrap_or(0) as usize;
        let payload_start = pos + TLV_HEADER_LEN;
        let payload_end = payload_start + len;
        if payload_end > region.len() {
            return Err(StreamError::malformed(
                region_offset + pos,
                "attribute payload overruns command",
            ));
        }
        let payload = &region[payload_start..payload_end];

        let value = decode_attr_value(tag, payload).map_err(|reason| {
            StreamError::malformed(region_offset + pos, format!("attribute {tag}: {reason}"))
        })?;

        if !attrs.insert(tag, value) {
            return Err(StreamError::malformed(
                region_offset + pos,
                format!("duplicate attribute tag {tag}"),
            ));
        }

        pos = payload_end;
    }

    Ok(attrs)
}

fn decode_attr_value(tag: u16, payload: &[u8]) -> Result<AttrValue, &'static str> {
    use AttrTag::*;

    let Some(tag) = AttrTag::from_code(tag) else {
        return Ok(AttrValue::Raw(payload.to_vec()));
    };

    Ok(match tag {
        Ctransid | Ino | Size | Mode | Uid | Gid | Rdev | FileOffset | CloneCtransid
        | CloneOffset | CloneLen => {
            let bytes: [u8; 8] = payload.try_into().map_err(|_| "expected 8-byte integer")?;
            AttrValue::U64(u64::from_le_bytes(bytes))
        }
        Uuid | CloneUuid => {
            let bytes: [u8; UUID_LEN] = payload.try_into().map_err(|_| "expected 16-byte uuid")?;
            AttrValue::Uuid(bytes)
        }
        Ctime | Mtime | Atime | Otime => {
            if payload.len() != TIMESPEC_LEN {
                return Err("expected 12-byte timespec");
            }
            let secs = u64::from_le_bytes(payload[..8].try_into().map_err(|_| "bad timespec")?);
            let nsecs = u32::from_le_bytes(payload[8..].try_into().map_err(|_| "bad timespec")?);
            AttrValue::Timespec { secs, nsecs }
        }
        Path | PathTo | PathLink | XattrName | XattrData | Data | ClonePath => {
            AttrValue::Bytes(payload.to_vec())
        }
    })
}

/// Decode a whole buffer eagerly. Convenience for callers that do not
/// need streaming or cancellation.
pub fn decode_all(buf: &[u8], options: &DecodeOptions) -> Result<Vec<Command>, StreamError> {
    let mut decoder = StreamDecoder::new(buf, options)?;
    let mut commands = Vec::new();
    while let Some(cmd) = decoder.next_command()? {
        commands.push(cmd);
    }
    Ok(commands)
}

fn read_u16(buf: &[u8], pos: usize) -> Option<u16> {
    let bytes = buf.get(pos..pos + 2)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

fn read_u32(buf: &[u8], pos: usize) -> Option<u32> {
    let bytes = buf.get(pos..pos + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
#[path = "decode_tests.rs"]
mod tests;
