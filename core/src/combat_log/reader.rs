use crate::combat_log::{CombatEvent, LogParser, ParseError, ReaderError};
use encoding_rs::WINDOWS_1252;
use memchr::{memchr_iter, memrchr};
use memmap2::Mmap;
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

#[cfg(test)]
mod tests;

/// Result of one tail read.
#[derive(Debug, PartialEq)]
pub enum ReadOutcome {
    Line { line_number: u64, text: String },
    /// Caught up with the writer; poll again later
    NoData,
    /// The file was deleted or truncated underneath us
    Lost,
}

/// Events classified from the bytes already present when a file is attached.
pub struct CatchUp {
    pub events: Vec<Result<CombatEvent, ParseError>>,
    /// Byte offset just past the last complete line
    pub end_pos: u64,
    pub line_count: u64,
}

pub struct Reader {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    position: u64,
    line_number: u64,
}

impl Reader {
    /// Open `path` for tailing, starting at byte `position`.
    pub async fn open(path: PathBuf, position: u64, line_number: u64) -> Result<Self, ReaderError> {
        let file = File::open(&path).await.map_err(|source| ReaderError::OpenFile {
            path: path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(position))
            .await
            .map_err(|source| ReaderError::Seek {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            reader,
            buf: Vec::new(),
            position,
            line_number,
        })
    }

    // bulk read of an attached file; decode and classify in parallel, keep file order
    pub fn read_existing(path: &Path, parser: &LogParser) -> Result<CatchUp, ReaderError> {
        let file = fs::File::open(path).map_err(|source| ReaderError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| ReaderError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if len == 0 {
            return Ok(CatchUp {
                events: Vec::new(),
                end_pos: 0,
                line_count: 0,
            });
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ReaderError::MemoryMap {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes = mmap.as_ref();

        // a trailing partial line is left for the tailer
        let Some(last_newline) = memrchr(b'\n', bytes) else {
            return Ok(CatchUp {
                events: Vec::new(),
                end_pos: 0,
                line_count: 0,
            });
        };
        let complete = &bytes[..=last_newline];

        let mut line_ranges: Vec<(u64, usize, usize)> = Vec::new();
        let mut start = 0;
        for (idx, end) in memchr_iter(b'\n', complete).enumerate() {
            if end > start {
                line_ranges.push((idx as u64 + 1, start, end));
            }
            start = end + 1;
        }
        let line_count = memchr_iter(b'\n', complete).count() as u64;

        let events: Vec<_> = line_ranges
            .par_iter()
            .filter_map(|&(line_number, start, end)| {
                let line = decode_bytes(&complete[start..end]);
                if line.trim().is_empty() {
                    return None;
                }
                Some(parser.parse_line(line_number, &line))
            })
            .collect();

        Ok(CatchUp {
            events,
            end_pos: complete.len() as u64,
            line_count,
        })
    }

    /// Read the next complete, non-blank line.
    pub async fn next_line(&mut self) -> Result<ReadOutcome, ReaderError> {
        loop {
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|source| ReaderError::ReadFile {
                    path: self.path.clone(),
                    source,
                })?;

            if read == 0 {
                return Ok(self.check_still_present().await);
            }
            self.position += read as u64;

            // partial line: keep it, the next read appends the rest
            if !self.buf.ends_with(b"\n") {
                return Ok(ReadOutcome::NoData);
            }

            self.line_number += 1;
            let text = decode_bytes(&self.buf).into_owned();
            self.buf.clear();

            if text.trim().is_empty() {
                continue;
            }
            return Ok(ReadOutcome::Line {
                line_number: self.line_number,
                text,
            });
        }
    }

    async fn check_still_present(&self) -> ReadOutcome {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.len() >= self.position => ReadOutcome::NoData,
            Ok(meta) => {
                tracing::info!(
                    path = %self.path.display(),
                    size = meta.len(),
                    position = self.position,
                    "Log file truncated"
                );
                ReadOutcome::Lost
            }
            Err(_) => {
                tracing::info!(path = %self.path.display(), "Log file removed");
                ReadOutcome::Lost
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Offset just past the last complete line; a held partial line is not
    /// counted, so reopening here reads it again in full.
    pub fn committed_position(&self) -> u64 {
        self.position - self.buf.len() as u64
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

/// Decode one raw line, preferring UTF-8 and falling back to Windows-1252.
/// Line terminators are stripped.
pub fn decode_bytes(bytes: &[u8]) -> Cow<'_, str> {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b'\n' || bytes[end - 1] == b'\r') {
        end -= 1;
    }
    let bytes = &bytes[..end];

    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}
