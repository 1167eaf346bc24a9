use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDateTime;

use crate::digest::Digest;

/// Writes a plain-text copy of every digest into an archive directory.
#[derive(Debug, Clone)]
pub struct ArchiveSink {
    dir: PathBuf,
    enabled: bool,
    archive_empty: bool,
}

impl ArchiveSink {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool, archive_empty: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
            archive_empty,
        }
    }

    /// Archives `digest` unless a toggle disables it. Write failures are
    /// logged and reported as `None`.
    pub fn store(&self, digest: &Digest, now: NaiveDateTime) -> Option<PathBuf> {
        if !self.enabled {
            tracing::debug!("digest archive disabled");
            return None;
        }
        if digest.is_empty() && !self.archive_empty {
            tracing::debug!("archive of empty digests disabled");
            return None;
        }

        match self.write(digest, now) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "digest archived");
                Some(path)
            }
            Err(err) => {
                tracing::error!("failed to archive digest: {err:#}");
                None
            }
        }
    }

    fn write(&self, digest: &Digest, now: NaiveDateTime) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create archive dir: {}", self.dir.display()))?;

        let stem = format!(
            "{}_{}",
            now.format("%Y%m%d_%H%M%S"),
            sanitize_subject(&digest.subject)
        );
        let contents = format!(
            "Betreff: {}\nDatum: {}\n{}\n\n{}",
            digest.subject,
            now.format("%d.%m.%Y %H:%M:%S"),
            "-".repeat(50),
            digest.text_body
        );

        let mut attempt = 0_u32;
        loop {
            let file_name = match attempt {
                0 => format!("{stem}.txt"),
                n => format!("{stem}_{n}.txt"),
            };
            let path = self.dir.join(file_name);
            let mut file = match OpenOptions::new().create_new(true).write(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    continue;
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("create archive file: {}", path.display()));
                }
            };
            file.write_all(contents.as_bytes())
                .with_context(|| format!("write archive file: {}", path.display()))?;
            return Ok(path);
        }
    }
}

/// Strips characters that are not allowed in file names and replaces spaces
/// with underscores.
pub fn sanitize_subject(subject: &str) -> String {
    subject
        .chars()
        .filter(|ch| !matches!(ch, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .collect()
}
