//! Storage of evaluated results under opaque ids.

#[cfg(test)]
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::compass::{io_common::write_atomically, *};

/// A key-value store for the results of a respondent.
pub trait ResultStore {
    /// Stores the results and returns their id.
    fn save(&mut self, results: &[CandidateMatchJson]) -> CompassResult<String>;

    /// The results stored under this id, if any.
    fn load(&self, id: &str) -> CompassResult<Option<Vec<CandidateMatchJson>>>;
}

// Ids are hex SHA-256 digests.
fn is_valid_id(id: &str) -> bool {
    id.len() == 64 && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn make_id(salt: &str, payload: &str) -> String {
    sha256::digest(format!("{}\n{}", salt, payload))
}

/// Keeps the results in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<CandidateMatchJson>>,
    counter: u64,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

#[cfg(test)]
impl ResultStore for MemoryStore {
    fn save(&mut self, results: &[CandidateMatchJson]) -> CompassResult<String> {
        let payload = serde_json::to_string(results).context(SerializingJsonSnafu {})?;
        self.counter += 1;
        let id = make_id(&self.counter.to_string(), &payload);
        self.entries.insert(id.clone(), results.to_vec());
        Ok(id)
    }

    fn load(&self, id: &str) -> CompassResult<Option<Vec<CandidateMatchJson>>> {
        ensure!(is_valid_id(id), InvalidResultIdSnafu { id });
        Ok(self.entries.get(id).cloned())
    }
}

/// Keeps each result in a JSON file of a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
    saved: u64,
}

impl DirectoryStore {
    pub fn new(dir: &str) -> DirectoryStore {
        DirectoryStore {
            dir: PathBuf::from(dir),
            saved: 0,
        }
    }

    fn file_path(&self, id: &str) -> String {
        self.dir.join(format!("{}.json", id)).display().to_string()
    }
}

impl ResultStore for DirectoryStore {
    fn save(&mut self, results: &[CandidateMatchJson]) -> CompassResult<String> {
        let payload = serde_json::to_string(results).context(SerializingJsonSnafu {})?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.saved += 1;
        let salt = format!("{}-{}-{}", nanos, std::process::id(), self.saved);
        let id = make_id(&salt, &payload);
        let dir = self.dir.display().to_string();
        fs::create_dir_all(&self.dir).context(WritingFileSnafu { path: dir })?;
        let path = self.file_path(&id);
        write_atomically(&path, &payload)?;
        info!("Saved {} results as {}", results.len(), id);
        Ok(id)
    }

    fn load(&self, id: &str) -> CompassResult<Option<Vec<CandidateMatchJson>>> {
        ensure!(is_valid_id(id), InvalidResultIdSnafu { id });
        let path = self.file_path(id);
        if !Path::new(&path).exists() {
            debug!("load: no file {}", path);
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: &path })?;
        let l: Vec<CandidateMatchJson> =
            serde_json::from_str(&contents).context(ParsingJsonSnafu { path: &path })?;
        Ok(Some(l))
    }
}
