use super::*;
use crate::builder::StreamBuilder;
use crate::error::StreamError;
use crate::path::StreamPath;
use crate::wire::{AttrTag, CommandKind};

fn decode(buf: &[u8]) -> Result<Vec<Command>, StreamError> {
    decode_all(buf, &DecodeOptions::default())
}

#[test]
fn rejects_short_buffer() {
    let err = StreamDecoder::new(b"btrfs", &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, StreamError::Malformed { offset: 0, .. }));
}

#[test]
fn rejects_bad_magic() {
    let mut buf = StreamBuilder::new().finish();
    buf[0] = b'x';
    let err = decode(&buf).unwrap_err();
    assert!(matches!(err, StreamError::Malformed { offset: 0, .. }));
}

#[test]
fn rejects_unsupported_version() {
    let buf = StreamBuilder::with_version(9).finish();
    let err = decode(&buf).unwrap_err();
    match err {
        StreamError::UnsupportedVersion { got, supported } => {
            assert_eq!(got, 9);
            assert_eq!(supported, vec![1, 2]);
        }
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn accepts_both_supported_versions() {
    for version in [1u32, 2] {
        let buf = StreamBuilder::with_version(version).finish();
        let decoder = StreamDecoder::new(&buf, &DecodeOptions::default()).unwrap();
        assert_eq!(decoder.version(), version);
    }
}

#[test]
fn decodes_typed_attributes() {
    let mut b = StreamBuilder::new();
    b.mkfile("dir/file.txt", 257).truncate("dir/file.txt", 4096);
    let commands = decode(&b.finish()).unwrap();

    assert_eq!(commands.len(), 3);

    let mkfile = &commands[0];
    assert_eq!(mkfile.kind, Some(CommandKind::Mkfile));
    assert_eq!(mkfile.attrs.u64(AttrTag::Ino), Some(257));
    assert_eq!(
        mkfile.attrs.path(AttrTag::Path),
        Some(StreamPath::from("dir/file.txt"))
    );

    let truncate = &commands[1];
    assert_eq!(truncate.kind, Some(CommandKind::Truncate));
    assert_eq!(truncate.attrs.u64(AttrTag::Size), Some(4096));

    let end = &commands[2];
    assert_eq!(end.kind, Some(CommandKind::End));
    assert!(end.attrs.is_empty());
}

#[test]
fn trailing_bytes_after_end_are_ignored() {
    let mut buf = StreamBuilder::new().finish();
    buf.extend_from_slice(b"garbage after the terminator");
    let commands = decode(&buf).unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].kind, Some(CommandKind::End));
}

#[test]
fn missing_end_is_truncation() {
    let mut b = StreamBuilder::new();
    b.mkfile("f", 10);
    let buf = b.finish_without_end();
    let err = decode(&buf).unwrap_err();
    assert!(matches!(err, StreamError::Truncated { .. }));
}

#[test]
fn command_cut_mid_region_is_truncation() {
    let mut b = StreamBuilder::new();
    b.mkfile("some/longer/path", 10);
    let mut buf = b.finish();
    buf.truncate(buf.len() - 15);
    let err = decode(&buf).unwrap_err();
    assert!(matches!(err, StreamError::Truncated { .. }));
}

#[test]
fn unknown_command_is_surfaced_not_fatal() {
    let mut b = StreamBuilder::new();
    b.raw_command(400, &[(AttrTag::Path.code(), b"f")]);
    let commands = decode(&b.finish()).unwrap();
    assert_eq!(commands[0].kind, None);
    assert_eq!(commands[0].code, 400);
    assert_eq!(
        commands[0].attrs.path(AttrTag::Path),
        Some(StreamPath::from("f"))
    );
}

#[test]
fn unknown_attribute_tag_is_preserved_raw() {
    let mut b = StreamBuilder::new();
    b.raw_command(
        CommandKind::Unlink.code(),
        &[(AttrTag::Path.code(), b"f"), (999, b"\x01\x02")],
    );
    let commands = decode(&b.finish()).unwrap();
    let cmd = &commands[0];
    assert_eq!(cmd.kind, Some(CommandKind::Unlink));
    let raw = cmd
        .attrs
        .iter()
        .find_map(|(t, v)| (t == 999).then_some(v))
        .unwrap();
    assert_eq!(raw, &AttrValue::Raw(vec![1, 2]));
}

#[test]
fn duplicate_attribute_tag_is_malformed() {
    let mut b = StreamBuilder::new();
    b.raw_command(
        CommandKind::Unlink.code(),
        &[(AttrTag::Path.code(), b"a"), (AttrTag::Path.code(), b"b")],
    );
    let err = decode(&b.finish()).unwrap_err();
    match err {
        StreamError::Malformed { reason, .. } => assert!(reason.contains("duplicate")),
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[test]
fn wrong_integer_width_is_malformed() {
    let mut b = StreamBuilder::new();
    b.raw_command(
        CommandKind::Truncate.code(),
        &[(AttrTag::Path.code(), b"f"), (AttrTag::Size.code(), b"\x04\x00")],
    );
    let err = decode(&b.finish()).unwrap_err();
    assert!(matches!(err, StreamError::Malformed { .. }));
}

#[test]
fn crc_verification_accepts_builder_output() {
    let mut b = StreamBuilder::new();
    b.mkfile("f", 10).write("f", 0, b"data").unlink("f");
    let opts = DecodeOptions {
        verify_crc: true,
        ..DecodeOptions::default()
    };
    let commands = decode_all(&b.finish(), &opts).unwrap();
    assert_eq!(commands.len(), 4);
}

#[test]
fn crc_verification_catches_flipped_byte() {
    let mut b = StreamBuilder::new();
    b.mkfile("f", 10);
    let mut buf = b.finish();
    let last = buf.len() - 1;
    buf[last] ^= 0xff;

    let opts = DecodeOptions {
        verify_crc: true,
        ..DecodeOptions::default()
    };
    let err = decode_all(&buf, &opts).unwrap_err();
    assert!(matches!(err, StreamError::CorruptCommand { .. }));

    // Same buffer decodes when verification is off.
    assert!(decode(&buf).is_ok());
}

#[test]
fn cancellation_stops_at_command_boundary() {
    let mut b = StreamBuilder::new();
    b.mkfile("a", 1).mkfile("b", 2);
    let buf = b.finish();

    let token = CancelToken::new();
    let mut decoder = StreamDecoder::new(&buf, &DecodeOptions::default())
        .unwrap()
        .with_cancel(token.clone());

    assert!(decoder.next_command().unwrap().is_some());
    token.cancel();
    let err = decoder.next_command().unwrap_err();
    assert!(matches!(err, StreamError::Cancelled));
}

#[test]
fn symlink_command_round_trips_target() {
    let mut b = StreamBuilder::new();
    b.symlink("lnk", 30, "../target");
    let commands = decode(&b.finish()).unwrap();
    let cmd = &commands[0];
    assert_eq!(cmd.kind, Some(CommandKind::Symlink));
    assert_eq!(
        cmd.attrs.path(AttrTag::PathLink),
        Some(StreamPath::from("../target"))
    );
    assert_eq!(cmd.attrs.u64(AttrTag::Ino), Some(30));
}

#[test]
fn non_utf8_paths_survive_decoding() {
    let raw: &[u8] = &[b'd', b'i', b'r', b'/', 0xfe, 0xff];
    let mut b = StreamBuilder::new();
    b.unlink(raw);
    let commands = decode(&b.finish()).unwrap();
    assert_eq!(commands[0].attrs.path(AttrTag::Path), Some(StreamPath::from(raw)));
}
