//! The fixed set of caller identities for a run.
use crate::error::RaceError;
use stampede_core::Credential;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
#[allow(unused_imports)]
use tracing::{debug, info, instrument};

/// Ordered credentials, loaded once and never mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Read a newline-delimited credential list. Blank lines are skipped, every other line is
    /// kept verbatim.
    #[instrument(name = "pool", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RaceError> {
        let path = path.as_ref();
        let unavailable = |source| RaceError::PoolUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unavailable)?;
        let pool = Self::from_reader(BufReader::new(file)).map_err(unavailable)?;

        info!("Loaded {} credentials", pool.len());
        Ok(pool)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut credentials = vec![];
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            credentials.push(Credential::from(line));
        }

        Ok(Self { credentials })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Credential> {
        self.credentials.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }

    /// Zero-based positions of the first repeated credential among the first `n` entries.
    pub fn find_duplicate(&self, n: usize) -> Option<(usize, usize)> {
        let mut seen = HashMap::with_capacity(n.min(self.len()));
        for (index, credential) in self.credentials.iter().take(n).enumerate() {
            if let Some(first) = seen.insert(credential.expose(), index) {
                debug!("Credential repeated at positions {first} and {index}");
                return Some((first, index));
            }
        }
        None
    }
}

impl<S: Into<Credential>> FromIterator<S> for CredentialPool {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            credentials: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn skips_blank_lines() {
        let input = "alpha\n\nbeta\r\n   \n gamma \n";
        let pool = CredentialPool::from_reader(Cursor::new(input)).unwrap();

        let values: Vec<_> = pool.iter().map(Credential::expose).collect();
        assert_eq!(values, ["alpha", "beta", " gamma "]);
    }

    #[test]
    fn empty_source() {
        let pool = CredentialPool::from_reader(Cursor::new("\n\n")).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "token-1\ntoken-2\n\ntoken-3").unwrap();

        let pool = CredentialPool::load(file.path()).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(2).map(Credential::expose), Some("token-3"));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = CredentialPool::load(dir.path().join("tokens.txt")).unwrap_err();
        assert!(matches!(err, RaceError::PoolUnavailable { .. }));
    }

    #[test]
    fn duplicates_only_matter_within_range() {
        let pool: CredentialPool = ["a", "b", "c", "a"].into_iter().collect();
        assert_eq!(pool.find_duplicate(3), None);
        assert_eq!(pool.find_duplicate(4), Some((0, 3)));
        assert_eq!(pool.find_duplicate(100), Some((0, 3)));
    }
}
