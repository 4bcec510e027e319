//! Binary input loader.
//!
//! Format: one 32-bit element count in native byte order, then that many
//! 32-bit signed integers. No header magic, footer, or checksum.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Load an array from the file at `path`.
///
/// Fails with an I/O error if the file is missing or unreadable, with
/// [`Error::Truncated`] if it ends before the declared element count, and
/// with [`Error::Allocation`] if the element buffer cannot be reserved.
pub fn load(path: &Path) -> Result<Vec<i32>> {
    let file = File::open(path)?;
    read_array(BufReader::new(file))
}

/// Read an array in the input format from any byte source.
pub fn read_array<R: Read>(mut input: R) -> Result<Vec<i32>> {
    let mut word = [0u8; 4];
    input.read_exact(&mut word)?;
    let declared = i32::from_ne_bytes(word);
    if declared < 0 {
        return Err(Error::Config(format!(
            "input header declares a negative element count ({declared})"
        )));
    }
    let declared = declared as usize;

    let mut data = Vec::new();
    data.try_reserve_exact(declared)
        .map_err(|_| Error::Allocation(declared))?;

    for got in 0..declared {
        if let Err(e) = input.read_exact(&mut word) {
            return if e.kind() == io::ErrorKind::UnexpectedEof {
                Err(Error::Truncated {
                    expected: declared,
                    got,
                })
            } else {
                Err(Error::Io(e))
            };
        }
        data.push(i32::from_ne_bytes(word));
    }
    Ok(data)
}
