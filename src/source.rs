// src/source.rs
use std::io::BufRead;

use crossbeam_channel::Sender;
use tracing::warn;

/// Reads hex-encoded events, one per line, and forwards the raw bytes.
///
/// Blank lines and `#` comments are skipped. Lines that are not valid hex
/// are logged and dropped. Returns the number of events forwarded; stops
/// early if the receiver has gone away.
pub fn start_reading<R: BufRead>(input: R, sender: Sender<Vec<u8>>) -> std::io::Result<usize> {
    let mut forwarded = 0;
    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let frame = match decode_line(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "skipping malformed input line");
                continue;
            }
        };

        if sender.send(frame).is_err() {
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}

/// Whitespace between byte groups is allowed: `01 85 2a00 ...`.
fn decode_line(line: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let compact: String = line.split_whitespace().collect();
    hex::decode(compact)
}
