// src/bot/samples.rs - Line-oriented storage for dynamic sample corpora

use std::fs;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleStoreError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read all samples, one per line, order preserved. A missing file is an
/// empty corpus, not an error.
pub fn read(path: &Path) -> Result<Vec<String>, SampleStoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    Ok(content.lines().map(str::to_string).collect())
}

/// Append a single sample line, creating the file when needed.
pub fn append(path: &Path, sample: &str) -> Result<(), SampleStoreError> {
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{sample}")?;
    Ok(())
}

/// Rewrite the file omitting every line equal to `sample`, returns the
/// number of lines removed. Zero matches is `NotFound`. The rewrite goes
/// through a temp file and rename so the corpus is never left truncated.
pub fn remove(path: &Path, sample: &str) -> Result<usize, SampleStoreError> {
    let lines = read(path)?;
    let kept: Vec<&String> = lines.iter().filter(|line| line.as_str() != sample).collect();
    let removed = lines.len() - kept.len();
    if removed == 0 {
        return Err(SampleStoreError::NotFound);
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = fs::File::create(&tmp_path)?;
        for line in &kept {
            writeln!(tmp, "{line}")?;
        }
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(removed)
}
