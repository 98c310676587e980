//! .pidx file format reader/writer for the guidance index.
//!
//! The index lives in a directory; the directory's presence is what marks an
//! index as existing. Inside it a single `index.pidx` file holds a fixed
//! 64-byte little-endian header followed by a JSON payload of stored pages.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::types::{GuideStore, PictoError, PictoResult, StoredPage};

/// Magic bytes: "PIDX"
const PIDX_MAGIC: u32 = 0x50494458;

/// Current format version.
const FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 64;

/// File name of the index inside its persist directory.
pub const INDEX_FILE_NAME: &str = "index.pidx";

/// Location of the index file for a persist directory.
pub fn index_file(persist_dir: &Path) -> PathBuf {
    persist_dir.join(INDEX_FILE_NAME)
}

/// Writer for .pidx files.
pub struct IndexWriter;

/// Reader for .pidx files.
pub struct IndexReader;

impl IndexWriter {
    /// Write a guide store to a file, creating parent directories.
    pub fn write_to_file(store: &GuideStore, path: &Path) -> PictoResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a sibling temp file first so a crash never leaves a torn index.
        let tmp = path.with_extension("pidx.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            Self::write_to(store, &mut file)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Write a guide store to any writer.
    pub fn write_to<W: Write>(store: &GuideStore, writer: &mut W) -> PictoResult<()> {
        let payload = serde_json::to_vec(&SerializedStore {
            pages: &store.pages,
            next_id: store.next_id,
        })
        .map_err(|e| PictoError::Storage(format!("Serialization failed: {e}")))?;

        let mut header = [0u8; HEADER_SIZE];
        write_u32(&mut header[0..4], PIDX_MAGIC);
        write_u16(&mut header[4..6], FORMAT_VERSION);
        write_u16(&mut header[6..8], 0); // flags
        write_u64(&mut header[8..16], store.pages.len() as u64);
        write_u32(&mut header[16..20], store.embedding_dim);
        write_u64(&mut header[24..32], store.created_at);
        write_u64(&mut header[32..40], store.updated_at);
        write_u64(&mut header[40..48], payload.len() as u64);

        writer.write_all(&header)?;
        writer.write_all(&payload)?;
        Ok(())
    }
}

impl IndexReader {
    /// Read a guide store from a file.
    pub fn read_from_file(path: &Path) -> PictoResult<GuideStore> {
        let mut file = std::fs::File::open(path)?;
        Self::read_from(&mut file)
    }

    /// Read a guide store from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> PictoResult<GuideStore> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let magic = read_u32(&header[0..4]);
        if magic != PIDX_MAGIC {
            return Err(PictoError::Storage(format!(
                "Invalid magic: expected 0x{PIDX_MAGIC:08X}, got 0x{magic:08X}"
            )));
        }

        let version = read_u16(&header[4..6]);
        if version != FORMAT_VERSION {
            return Err(PictoError::Storage(format!(
                "Unsupported version: {version}"
            )));
        }

        let page_count = read_u64(&header[8..16]);
        let embedding_dim = read_u32(&header[16..20]);
        let created_at = read_u64(&header[24..32]);
        let updated_at = read_u64(&header[32..40]);
        let payload_len = read_u64(&header[40..48]);

        // The header length is untrusted; only allocate what the reader yields.
        let mut payload = Vec::new();
        reader.take(payload_len).read_to_end(&mut payload)?;
        if payload.len() as u64 != payload_len {
            return Err(PictoError::Storage(format!(
                "Truncated payload: header says {payload_len} bytes, found {}",
                payload.len()
            )));
        }

        let serialized: DeserializedStore = serde_json::from_slice(&payload)
            .map_err(|e| PictoError::Storage(format!("Deserialization failed: {e}")))?;

        if serialized.pages.len() as u64 != page_count {
            return Err(PictoError::Storage(format!(
                "Page count mismatch: header says {page_count}, payload has {}",
                serialized.pages.len()
            )));
        }

        Ok(GuideStore {
            pages: serialized.pages,
            embedding_dim,
            next_id: serialized.next_id,
            created_at,
            updated_at,
        })
    }
}

#[derive(serde::Serialize)]
struct SerializedStore<'a> {
    pages: &'a [StoredPage],
    next_id: u64,
}

#[derive(serde::Deserialize)]
struct DeserializedStore {
    pages: Vec<StoredPage>,
    next_id: u64,
}

// Little-endian byte helpers
fn write_u16(buf: &mut [u8], val: u16) {
    buf[..2].copy_from_slice(&val.to_le_bytes());
}
fn write_u32(buf: &mut [u8], val: u32) {
    buf[..4].copy_from_slice(&val.to_le_bytes());
}
fn write_u64(buf: &mut [u8], val: u64) {
    buf[..8].copy_from_slice(&val.to_le_bytes());
}
fn read_u16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}
fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}
fn read_u64(buf: &[u8]) -> u64 {
    u64::from_le_bytes([buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7]])
}
