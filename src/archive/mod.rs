//! Archive multiplexing.
//!
//! A single downloaded blob may really be a bundle of files. [`expand`]
//! sniffs the bytes and, for tar (optionally gzip or bzip2 compressed) and
//! zip archives, produces one [`Content`] per member file. Anything else is
//! handed back untouched.

pub mod tar;
pub mod zip;

use std::io::{self, Read};

use bytes::Bytes;

use crate::content::{Content, ContentStream};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Maximum decompressed size (1GB) of a single archive member
pub const MAX_MEMBER_SIZE: u64 = 1024 * 1024 * 1024;

/// Header-declared sizes are untrusted; never reserve more than this up front
const MAX_PREALLOCATION: u64 = 8 * 1024 * 1024;

/// Read one archive member of `declared` bytes, failing once more than
/// `limit` bytes come out of `reader`.
///
/// The bytes read so far are returned alongside any I/O error. An oversized
/// member returns no data.
pub(crate) fn read_member<R: Read>(
    reader: R,
    declared: u64,
    limit: u64,
) -> (Vec<u8>, io::Result<()>) {
    let capacity = declared.min(limit).min(MAX_PREALLOCATION) as usize;
    let mut data = Vec::with_capacity(capacity);
    match reader.take(limit.saturating_add(1)).read_to_end(&mut data) {
        Ok(n) if n as u64 > limit => (
            Vec::new(),
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("member exceeds the {limit} byte extraction limit"),
            )),
        ),
        Ok(_) => (data, Ok(())),
        Err(e) => (data, Err(e)),
    }
}

/// Compression wrapper detected in front of a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if data.starts_with(BZIP2_MAGIC) {
            Compression::Bzip2
        } else {
            Compression::None
        }
    }

    pub(crate) fn reader(self, data: Bytes) -> Box<dyn Read + Send> {
        let raw = std::io::Cursor::new(data);
        match self {
            Compression::None => Box::new(raw),
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(raw)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(raw)),
        }
    }
}

/// Expand `content` into its member files, calling `emit` for each one.
///
/// Members are emitted in archive order. Expansion stops early when `emit`
/// returns `false`.
pub fn expand<F>(content: Content, mut emit: F)
where
    F: FnMut(Content) -> bool,
{
    if content.data.is_empty() {
        emit(content);
        return;
    }

    let compression = Compression::detect(&content.data);
    if compression != Compression::None {
        match tar::expand(compression.reader(content.data.clone()), &mut emit) {
            tar::Outcome::Expanded => return,
            tar::Outcome::NotTar => {}
        }
    }

    match tar::expand(Compression::None.reader(content.data.clone()), &mut emit) {
        tar::Outcome::Expanded => return,
        tar::Outcome::NotTar => {}
    }

    match zip::expand(&content.data, &mut emit) {
        zip::Outcome::Expanded => {}
        zip::Outcome::NotZip => {
            emit(content);
        }
    }
}

/// Expand `content` on a blocking task, yielding members lazily through a
/// bounded stream of `capacity` slots.
pub fn multiplex(content: Content, capacity: usize) -> ContentStream {
    let (tx, stream) = ContentStream::channel(capacity);
    tokio::task::spawn_blocking(move || {
        expand(content, |item| tx.blocking_send(item));
    });
    stream
}
