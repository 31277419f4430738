use std::io::{Cursor, Read, Seek};

use super::{MAX_MEMBER_SIZE, read_member};
use crate::content::Content;
use crate::error::FetchError;

/// Result of trying to read a blob as zip
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Expanded,
    NotZip,
}

/// Emit every file entry of the zip archive in `data`.
///
/// Unlike tar, a failure on one entry is attached to that entry and the
/// remaining entries are still emitted.
pub fn expand<F>(data: &[u8], emit: &mut F) -> Outcome
where
    F: FnMut(Content) -> bool,
{
    let mut archive = match ::zip::ZipArchive::new(Cursor::new(data)) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::trace!(error = %e, "not a zip archive");
            return Outcome::NotZip;
        }
    };

    for index in 0..archive.len() {
        let (name, is_dir) = match archive.by_index_raw(index) {
            Ok(file) => (file.name().to_string(), file.is_dir()),
            Err(e) => {
                if !emit(Content::failed(format!("/#{index}"), e.into())) {
                    return Outcome::Expanded;
                }
                continue;
            }
        };
        if is_dir {
            continue;
        }

        let content = read_entry(&mut archive, index, format!("/{name}"), MAX_MEMBER_SIZE);
        if !emit(content) {
            return Outcome::Expanded;
        }
    }

    Outcome::Expanded
}

fn read_entry<R>(
    archive: &mut ::zip::ZipArchive<R>,
    index: usize,
    path: String,
    limit: u64,
) -> Content
where
    R: Read + Seek,
{
    let mut file = match archive.by_index(index) {
        Ok(file) => file,
        Err(e) => return Content::failed(path, e.into()),
    };

    let declared = file.size();
    match read_member(&mut file, declared, limit) {
        (data, Ok(())) => Content::new(path, data),
        (_, Err(e)) => Content::failed(path, FetchError::Archive(e)),
    }
}
