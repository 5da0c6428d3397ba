//! Per-user append-only record file (spec §3 "Per-user store", §4.7).
//!
//! Each record is `u32 name_len, name bytes, u32 content_len, content bytes`,
//! fixed big-endian (the reference implementation persists this in host byte order;
//! this reimplementation fixes that the same way it fixes `db.bin`, see design
//! notes flag 3). The file lives in the server's storage directory, named by the
//! registry entry's `storage_path`.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new<P: Into<PathBuf>>(root: P) -> Store {
        Store { root: root.into() }
    }

    fn path_for(&self, storage_path: &str) -> PathBuf {
        self.root.join(storage_path)
    }

    /// Appends one `(name, content)` record. Fails only on an underlying I/O error.
    pub fn append(&self, storage_path: &str, name: &[u8], content: &[u8]) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(storage_path))?;
        let mut writer = BufWriter::new(file);

        writer.write_u32::<BigEndian>(name.len() as u32)?;
        writer.write_all(name)?;
        writer.write_u32::<BigEndian>(content.len() as u32)?;
        writer.write_all(content)?;
        writer.flush()
    }

    /// Names of every record in the store, in append order. Returns an error if the
    /// file is missing, empty, or truncated mid-record.
    pub fn list(&self, storage_path: &str) -> io::Result<Vec<Vec<u8>>> {
        let file = self.open_nonempty(storage_path)?;
        let mut reader = BufReader::new(file);
        let mut names = Vec::new();

        loop {
            let name_len = match reader.read_u32::<BigEndian>() {
                Ok(len) => len,
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err),
            };

            let mut name = vec![0u8; name_len as usize];
            reader.read_exact(&mut name)?;

            let content_len = reader.read_u32::<BigEndian>()?;
            reader.seek(SeekFrom::Current(content_len as i64))?;

            names.push(name);
        }

        Ok(names)
    }

    /// Content of the first record whose name byte-contains `query` (spec §8
    /// testable property 7: substring match, first hit wins).
    pub fn pull(&self, storage_path: &str, query: &[u8]) -> io::Result<Option<Vec<u8>>> {
        let file = self.open_nonempty(storage_path)?;
        let mut reader = BufReader::new(file);

        loop {
            let name_len = match reader.read_u32::<BigEndian>() {
                Ok(len) => len,
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err),
            };

            let mut name = vec![0u8; name_len as usize];
            reader.read_exact(&mut name)?;

            let content_len = reader.read_u32::<BigEndian>()?;

            if contains_subslice(&name, query) {
                let mut content = vec![0u8; content_len as usize];
                reader.read_exact(&mut content)?;
                return Ok(Some(content));
            }

            reader.seek(SeekFrom::Current(content_len as i64))?;
        }

        Ok(None)
    }

    fn open_nonempty(&self, storage_path: &str) -> io::Result<File> {
        let file = File::open(self.path_for(storage_path))?;
        if file.metadata()?.len() == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "store is empty"));
        }
        Ok(file)
    }
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_then_list_then_pull() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());

        store.append("u1", b"./hello.txt", b"Hi!").unwrap();

        let names = store.list("u1").unwrap();
        assert_eq!(names, vec![b"./hello.txt".to_vec()]);

        let content = store.pull("u1", b"hello").unwrap();
        assert_eq!(content, Some(b"Hi!".to_vec()));
    }

    #[test]
    fn pull_miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store.append("u1", b"./hello.txt", b"Hi!").unwrap();

        assert_eq!(store.pull("u1", b"zzz").unwrap(), None);
    }

    #[test]
    fn list_on_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(store.list("nonexistent").is_err());
    }

    #[test]
    fn pull_matches_first_appended_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store.append("u1", b"report-v1.txt", b"first").unwrap();
        store.append("u1", b"report-v2.txt", b"second").unwrap();

        let content = store.pull("u1", b"report").unwrap();
        assert_eq!(content, Some(b"first".to_vec()));
    }
}
