use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use btrdiff_runtime::SUDO_ENV;
use log::debug;

fn use_sudo() -> bool {
    match std::env::var(SUDO_ENV) {
        Ok(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
        Err(_) => true,
    }
}

/// Run `btrfs send --no-data -p OLD NEW` and capture the stream.
/// Sending requires root, so the command goes through sudo unless the
/// environment opts out.
pub fn capture_send_stream(old: &Path, new: &Path) -> Result<Vec<u8>> {
    let mut cmd = if use_sudo() {
        let mut c = Command::new("sudo");
        c.arg("btrfs");
        c
    } else {
        Command::new("btrfs")
    };
    cmd.arg("send")
        .arg("--no-data")
        .arg("-p")
        .arg(old)
        .arg(new);

    debug!("running {cmd:?}");
    let output = cmd
        .output()
        .with_context(|| format!("failed to spawn btrfs send for {}", new.display()))?;

    if !output.status.success() {
        bail!(
            "btrfs send failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(output.stdout)
}

/// Stream bytes for a snapshot pair: a previously captured file when
/// given, live `btrfs send` output otherwise.
pub fn load_stream(old: &Path, new: &Path, stream_file: Option<&Path>) -> Result<Vec<u8>> {
    match stream_file {
        Some(file) => {
            fs::read(file).with_context(|| format!("failed to read stream file {}", file.display()))
        }
        None => capture_send_stream(old, new),
    }
}
