//! In-memory name -> storage-path mapping mirrored to `db.bin` (spec §4.6).
//!
//! The reference implementation matches names by byte-substring containment, the
//! same bug it has in `pull`. For `NAME` that is surprising - two unrelated users
//! named `al` and `alice` would collide - so this reimplementation looks entries up
//! by exact equality instead and documents the change (design notes, flag 1). The
//! substring match required for `pull` lives in [`crate::store`], unaffected by this
//! decision.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flux::SharedRng;
use rand::Rng;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    pub name: String,
    pub storage_path: String,
}

pub struct Registry {
    entries: Vec<Entry>,
    db_path: PathBuf,
}

impl Registry {
    /// Loads `db_path` if it exists; starts empty if it does not. A truncated or
    /// malformed file is a fatal startup error.
    pub fn load<P: AsRef<Path>>(db_path: P) -> io::Result<Registry> {
        let db_path = db_path.as_ref().to_path_buf();

        let file = match File::open(&db_path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Registry {
                    entries: Vec::new(),
                    db_path,
                })
            }
            Err(err) => return Err(err),
        };

        let mut reader = BufReader::new(file);
        let count = reader.read_u32::<BigEndian>()?;
        let mut entries = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let name = read_length_prefixed_string(&mut reader)?;
            let storage_path = read_length_prefixed_string(&mut reader)?;
            entries.push(Entry { name, storage_path });
        }

        Ok(Registry { entries, db_path })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose stored name equals `name` exactly.
    pub fn lookup(&self, name: &[u8]) -> Option<String> {
        self.entries
            .iter()
            .find(|entry| entry.name.as_bytes() == name)
            .map(|entry| entry.storage_path.clone())
    }

    /// Appends a new entry with a freshly generated random decimal storage path and
    /// persists the snapshot before returning, so the on-disk state and in-memory
    /// state never disagree after a successful call.
    pub fn insert(&mut self, name: &[u8], rng: &mut SharedRng) -> io::Result<String> {
        let id: u64 = rng.gen();
        let storage_path = id.to_string();

        self.entries.push(Entry {
            name: String::from_utf8_lossy(name).into_owned(),
            storage_path: storage_path.clone(),
        });

        self.snapshot()?;
        Ok(storage_path)
    }

    /// Serializes the registry to `db.bin`: `u32 count, (u32 name_len, name bytes,
    /// u32 path_len, path bytes)*`, fixed big-endian (the reference implementation
    /// uses host byte order here; this reimplementation fixes that, see design notes
    /// flag 3).
    pub fn snapshot(&self) -> io::Result<()> {
        let tmp_path = self.db_path.with_extension("bin.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_u32::<BigEndian>(self.entries.len() as u32)?;
            for entry in &self.entries {
                write_length_prefixed(&mut writer, entry.name.as_bytes())?;
                write_length_prefixed(&mut writer, entry.storage_path.as_bytes())?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.db_path)
    }
}

fn read_length_prefixed_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = reader.read_u32::<BigEndian>()?;
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_length_prefixed<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_u32::<BigEndian>(bytes.len() as u32)?;
    writer.write_all(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux::SharedRng;

    #[test]
    fn missing_db_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("db.bin")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn insert_then_snapshot_then_reload_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("db.bin");
        let mut rng = SharedRng::new(1);

        let mut registry = Registry::load(&db_path).unwrap();
        registry.insert(b"alice", &mut rng).unwrap();
        registry.insert(b"bob", &mut rng).unwrap();

        let reloaded = Registry::load(&db_path).unwrap();
        assert_eq!(reloaded.entries, registry.entries);
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn lookup_is_exact_not_substring() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = SharedRng::new(1);
        let mut registry = Registry::load(dir.path().join("db.bin")).unwrap();
        registry.insert(b"alice", &mut rng).unwrap();

        assert!(registry.lookup(b"al").is_none());
        assert!(registry.lookup(b"alice").is_some());
    }
}
