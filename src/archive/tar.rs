use std::io::{self, Read};

use super::{MAX_MEMBER_SIZE, read_member};
use crate::content::Content;
use crate::error::FetchError;

/// Result of trying to read a blob as tar
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The first header parsed; members (possibly none) were emitted
    Expanded,
    /// The stream is not a tar archive, nothing was emitted
    NotTar,
}

/// Emit every regular file of the tar stream in `reader`.
///
/// Paths are the entry names prefixed with `/`. An error while reading an
/// entry's data is attached to that entry and ends the expansion.
pub fn expand<R, F>(reader: R, emit: &mut F) -> Outcome
where
    R: Read,
    F: FnMut(Content) -> bool,
{
    let mut archive = ::tar::Archive::new(reader);
    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(_) => return Outcome::NotTar,
    };

    let mut read_any = false;
    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            // Garbage before the first header means this was never a tar;
            // garbage afterwards only truncates the listing.
            Err(e) if !read_any => {
                tracing::trace!(error = %e, "not a tar stream");
                return Outcome::NotTar;
            }
            Err(e) => {
                tracing::debug!(error = %e, "tar stream ended with a bad header");
                return Outcome::Expanded;
            }
        };
        read_any = true;

        // Only regular files are interesting.
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = format!("/{}", String::from_utf8_lossy(&entry.path_bytes()));
        let expected = entry.size();
        let (data, read) = read_member(&mut entry, expected, MAX_MEMBER_SIZE);
        let read = read.and_then(|()| {
            if (data.len() as u64) < expected {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("entry truncated after {} of {expected} bytes", data.len()),
                ))
            } else {
                Ok(())
            }
        });
        match read {
            Ok(()) => {
                if !emit(Content::new(path, data)) {
                    return Outcome::Expanded;
                }
            }
            Err(e) => {
                emit(Content {
                    path,
                    data: data.into(),
                    error: Some(FetchError::Archive(e)),
                });
                return Outcome::Expanded;
            }
        }
    }

    Outcome::Expanded
}
