use std::io::BufRead;
use std::path::Path;

use crate::error::CoreError;
use crate::partition::Vocabulary;

/// Read the vocabulary from an embedding text file: the first field of each
/// line, in file order, stopping after `limit` lines when given.
///
/// Vector columns are ignored.
///
/// # Errors
///
/// Fails on read errors, empty lines, and duplicate tokens.
pub fn read_vocabulary(reader: impl BufRead, limit: Option<usize>) -> Result<Vocabulary, CoreError> {
    let mut tokens = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if limit.is_some_and(|limit| tokens.len() >= limit) {
            break;
        }
        let line = line.map_err(|err| CoreError::parse(idx + 1, err.to_string()))?;
        let token = line
            .split_whitespace()
            .next()
            .ok_or_else(|| CoreError::parse(idx + 1, "empty line while reading vocabulary"))?;
        tokens.push(token.to_owned());
    }
    Vocabulary::new(tokens)
}

/// Open `path` and read its vocabulary.
///
/// # Errors
///
/// See [`read_vocabulary`]; also fails when the file cannot be opened.
pub fn load_vocabulary(path: &Path, limit: Option<usize>) -> Result<Vocabulary, CoreError> {
    let file = std::fs::File::open(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_vocabulary(std::io::BufReader::new(file), limit)
}
