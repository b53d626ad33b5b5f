use crate::combat_log::{CatchUp, LogParser, ReadOutcome, Reader, ReaderError};
use crate::context::{LogFile, find_newest_log};
use std::path::{Path, PathBuf};

/// Discovers the newest combat log in a directory and tails it.
pub struct LogSource {
    dir: PathBuf,
    parser: LogParser,
    current: Option<LogFile>,
    reader: Option<Reader>,
    /// Where a detached reader stopped, so a reload of the same file resumes there
    resume_at: Option<(u64, u64)>,
}

impl LogSource {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            parser: LogParser::new(),
            current: None,
            reader: None,
            resume_at: None,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn parser(&self) -> &LogParser {
        &self.parser
    }

    pub fn current(&self) -> Option<&LogFile> {
        self.current.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.reader.is_some()
    }

    /// Newest log in the directory. A missing or unreadable directory counts
    /// as "nothing found".
    pub fn newest(&self) -> Option<LogFile> {
        match find_newest_log(&self.dir) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "Log directory unavailable");
                None
            }
        }
    }

    /// A log strictly newer than the one currently known, if any.
    pub fn newer_candidate(&self) -> Option<LogFile> {
        self.newest()
            .filter(|candidate| candidate.supersedes(self.current.as_ref()))
    }

    /// Switch to `file`, reading everything already written to it.
    pub async fn attach(&mut self, file: LogFile) -> Result<CatchUp, ReaderError> {
        self.detach();

        let path = file.path.clone();
        let parser = self.parser;
        let catch_up = tokio::task::spawn_blocking(move || Reader::read_existing(&path, &parser))
            .await
            .map_err(|e| ReaderError::ReadFile {
                path: file.path.clone(),
                source: std::io::Error::other(e),
            })??;

        let reader = Reader::open(file.path.clone(), catch_up.end_pos, catch_up.line_count).await?;
        tracing::info!(
            path = %file.path.display(),
            events = catch_up.events.len(),
            end_pos = catch_up.end_pos,
            "Attached combat log"
        );

        self.current = Some(file);
        self.reader = Some(reader);
        self.resume_at = None;
        Ok(catch_up)
    }

    /// Reopen the current file where the last reader stopped.
    pub async fn resume(&mut self) -> Result<bool, ReaderError> {
        if self.reader.is_some() {
            return Ok(true);
        }
        let (Some(file), Some((position, line_number))) = (&self.current, self.resume_at) else {
            return Ok(false);
        };
        let reader = Reader::open(file.path.clone(), position, line_number).await?;
        tracing::info!(path = %file.path.display(), position, "Resumed combat log");
        self.reader = Some(reader);
        Ok(true)
    }

    /// Stop reading but remember the file, so only a newer one replaces it.
    pub fn detach(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.resume_at = Some((reader.committed_position(), reader.line_number()));
        }
    }

    /// Next tail read. Read failures are reported as a lost file.
    pub async fn next_line(&mut self) -> ReadOutcome {
        let Some(reader) = self.reader.as_mut() else {
            return ReadOutcome::Lost;
        };
        match reader.next_line().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Combat log read failed");
                ReadOutcome::Lost
            }
        }
    }
}
