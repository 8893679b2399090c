//! Persistent state store: a key/value store drivers use to checkpoint
//! state (file positions, OAuth tokens) across restarts and reloads. The
//! core never interprets the values, only carries them.
//!
//! The on-disk format is hand-framed bytes behind the `SLP3` magic rather
//! than a `serde`-derived format: this is state whose byte layout needs to
//! stay stable across binary rebuilds regardless of which serialization
//! crate happens to be in the dependency tree at the time, and that has to
//! remain readable by a different build.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

const MAGIC: &[u8; 4] = b"SLP3";

/// One stored value plus the metadata needed to apply it safely — an
/// 8-bit version tag per entry so a driver can tell an old on-disk layout
/// from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistEntry {
    pub version: u8,
    pub survive_across_restarts: bool,
    pub value: Vec<u8>,
}

impl PersistEntry {
    pub fn new(version: u8, value: impl Into<Vec<u8>>) -> Self {
        Self { version, survive_across_restarts: true, value: value.into() }
    }
}

/// The keyed store itself. Held for the lifetime of a `Configuration`; a
/// reload carries forward whichever entries the new configuration's
/// drivers still reference by the same key.
#[derive(Debug, Default, Clone)]
pub struct PersistStore {
    entries: BTreeMap<String, PersistEntry>,
}

impl PersistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PersistEntry> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, entry: PersistEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<PersistEntry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes every entry with `survive_across_restarts` set, prefixed
    /// by the `SLP3` magic. Layout per entry: `u16` key length, key bytes,
    /// `u8` version, `u32` value length, value bytes.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        let durable: Vec<(&String, &PersistEntry)> =
            self.entries.iter().filter(|(_, e)| e.survive_across_restarts).collect();
        writer.write_all(&(durable.len() as u32).to_le_bytes())?;
        for (key, entry) in durable {
            let key_bytes = key.as_bytes();
            writer.write_all(&(key_bytes.len() as u16).to_le_bytes())?;
            writer.write_all(key_bytes)?;
            writer.write_all(&[entry.version])?;
            writer.write_all(&(entry.value.len() as u32).to_le_bytes())?;
            writer.write_all(&entry.value)?;
        }
        Ok(())
    }

    pub fn read_from(reader: &mut impl Read) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad persist store magic"));
        }

        let mut count_buf = [0u8; 4];
        reader.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf);

        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let mut len_buf = [0u8; 2];
            reader.read_exact(&mut len_buf)?;
            let key_len = u16::from_le_bytes(len_buf) as usize;
            let mut key_bytes = vec![0u8; key_len];
            reader.read_exact(&mut key_bytes)?;
            let key = String::from_utf8(key_bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

            let mut version_buf = [0u8; 1];
            reader.read_exact(&mut version_buf)?;
            let version = version_buf[0];

            let mut value_len_buf = [0u8; 4];
            reader.read_exact(&mut value_len_buf)?;
            let value_len = u32::from_le_bytes(value_len_buf) as usize;
            let mut value = vec![0u8; value_len];
            reader.read_exact(&mut value)?;

            entries.insert(key, PersistEntry { version, survive_across_restarts: true, value });
        }

        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_the_byte_framing() {
        let mut store = PersistStore::new();
        store.set("file:/var/log/app.log", PersistEntry::new(1, b"\x00\x01offset-42".to_vec()));
        store.set("oauth:destA", PersistEntry::new(2, b"token-bytes".to_vec()));

        let mut buf = Vec::new();
        store.write_to(&mut buf).unwrap();
        assert_eq!(&buf[..4], MAGIC);

        let restored = PersistStore::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("file:/var/log/app.log").unwrap().version, 1);
        assert_eq!(restored.get("oauth:destA").unwrap().value, b"token-bytes");
    }

    #[test]
    fn entries_not_marked_durable_are_dropped_on_write() {
        let mut store = PersistStore::new();
        let mut transient = PersistEntry::new(1, b"scratch".to_vec());
        transient.survive_across_restarts = false;
        store.set("scratch", transient);

        let mut buf = Vec::new();
        store.write_to(&mut buf).unwrap();
        let restored = PersistStore::read_from(&mut Cursor::new(buf)).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = b"XXXX\x00\x00\x00\x00".to_vec();
        assert!(PersistStore::read_from(&mut Cursor::new(buf)).is_err());
    }
}
