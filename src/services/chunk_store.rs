//! Splits payloads into bounded chunks and reassembles them.
//!
//! `split` and `reassemble` are pure. `write_chunks` and `read_file` bind
//! them to the `stage_file_chunks` table; chunk rows are insert-only.

use crate::entities::{prelude::*, stage_file_chunks, stage_file_data};
use crate::error::{LedgerError, Result};
use crate::utils::ids::{CHUNK_PREFIX, new_id};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u32,
    pub data: Vec<u8>,
}

/// Hex xxh3 digest stored alongside a file's metadata.
pub fn content_hash(payload: &[u8]) -> String {
    format!("{:016x}", xxh3_64(payload))
}

/// Cuts `payload` into `ceil(len / max_chunk)` chunks, indexed from zero.
pub fn split(payload: &[u8], max_chunk: usize) -> Result<Vec<Chunk>> {
    if max_chunk == 0 {
        return Err(LedgerError::DataQualityViolation(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    Ok(payload
        .chunks(max_chunk)
        .enumerate()
        .map(|(index, slice)| Chunk {
            index: index as u32,
            data: slice.to_vec(),
        })
        .collect())
}

/// Concatenates chunks in index order.
///
/// Indices must be exactly `0..n` and the total must equal `declared_size`;
/// anything else is reported as corruption of `file_id` and no bytes are
/// returned.
pub fn reassemble(file_id: &str, mut chunks: Vec<Chunk>, declared_size: u64) -> Result<Vec<u8>> {
    chunks.sort_by_key(|c| c.index);

    for (expected, chunk) in chunks.iter().enumerate() {
        let expected = expected as u32;
        if chunk.index != expected {
            let reason = if chunk.index < expected {
                format!("duplicate chunk index {}", chunk.index)
            } else {
                format!("missing chunk index {}", expected)
            };
            return Err(LedgerError::corruption(file_id, reason));
        }
    }

    let total: u64 = chunks.iter().map(|c| c.data.len() as u64).sum();
    if total != declared_size {
        return Err(LedgerError::corruption(
            file_id,
            format!(
                "reconstructed size {} does not match declared size {}",
                total, declared_size
            ),
        ));
    }

    let mut payload = Vec::with_capacity(total as usize);
    for chunk in chunks {
        payload.extend_from_slice(&chunk.data);
    }
    Ok(payload)
}

/// Inserts one row per chunk. Run inside the transaction that creates the
/// owning file record.
pub async fn write_chunks<C: ConnectionTrait>(
    conn: &C,
    file_id: &str,
    chunks: &[Chunk],
) -> Result<()> {
    let now = Utc::now();
    for chunk in chunks {
        stage_file_chunks::ActiveModel {
            chunk_id: Set(new_id(CHUNK_PREFIX)),
            file_id: Set(file_id.to_string()),
            chunk_index: Set(chunk.index as i32),
            chunk_size: Set(chunk.data.len() as i64),
            chunk_data: Set(chunk.data.clone()),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Loads and verifies the payload of a chunked file.
pub async fn read_file<C: ConnectionTrait>(conn: &C, file_id: &str) -> Result<Vec<u8>> {
    let meta = StageFileData::find_by_id(file_id)
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::not_found("file", file_id))?;

    let rows = StageFileChunks::find()
        .filter(stage_file_chunks::Column::FileId.eq(file_id))
        .order_by_asc(stage_file_chunks::Column::ChunkIndex)
        .all(conn)
        .await?;

    verify_and_join(&meta, rows)
}

fn verify_and_join(
    meta: &stage_file_data::Model,
    rows: Vec<stage_file_chunks::Model>,
) -> Result<Vec<u8>> {
    if rows.len() != meta.chunk_count as usize {
        return Err(LedgerError::corruption(
            &meta.file_id,
            format!("expected {} chunks, found {}", meta.chunk_count, rows.len()),
        ));
    }

    let mut chunks = Vec::with_capacity(rows.len());
    for row in rows {
        if row.chunk_size != row.chunk_data.len() as i64 {
            return Err(LedgerError::corruption(
                &meta.file_id,
                format!(
                    "chunk {} records {} bytes but holds {}",
                    row.chunk_index,
                    row.chunk_size,
                    row.chunk_data.len()
                ),
            ));
        }
        if row.chunk_index < 0 {
            return Err(LedgerError::corruption(
                &meta.file_id,
                format!("negative chunk index {}", row.chunk_index),
            ));
        }
        chunks.push(Chunk {
            index: row.chunk_index as u32,
            data: row.chunk_data,
        });
    }

    let payload = reassemble(&meta.file_id, chunks, meta.file_size.max(0) as u64)?;

    if let Some(expected) = &meta.content_hash {
        let actual = content_hash(&payload);
        if &actual != expected {
            return Err(LedgerError::corruption(
                &meta.file_id,
                format!("content hash {} does not match recorded {}", actual, expected),
            ));
        }
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_split_then_reassemble_is_identity() {
        for len in [0usize, 1, 6, 7, 8, 49, 1000] {
            for max in [1usize, 3, 7, 64] {
                let data = payload(len);
                let chunks = split(&data, max).unwrap();
                assert_eq!(chunks.len(), len.div_ceil(max));
                let back = reassemble("FILE_T", chunks, len as u64).unwrap();
                assert_eq!(back, data);
            }
        }
    }

    #[test]
    fn test_split_rejects_zero_chunk_size() {
        assert!(matches!(
            split(b"abc", 0),
            Err(LedgerError::DataQualityViolation(_))
        ));
    }

    #[test]
    fn test_reassemble_accepts_shuffled_order() {
        let data = payload(20);
        let mut chunks = split(&data, 6).unwrap();
        chunks.reverse();
        assert_eq!(reassemble("FILE_T", chunks, 20).unwrap(), data);
    }

    #[test]
    fn test_reassemble_detects_gap() {
        let mut chunks = split(&payload(20), 6).unwrap();
        chunks.remove(1);
        let err = reassemble("FILE_GAP", chunks, 20).unwrap_err();
        match err {
            LedgerError::CorruptionDetected { file_id, reason } => {
                assert_eq!(file_id, "FILE_GAP");
                assert!(reason.contains("missing chunk index 1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reassemble_detects_duplicate() {
        let mut chunks = split(&payload(12), 6).unwrap();
        chunks.push(chunks[0].clone());
        assert!(matches!(
            reassemble("FILE_DUP", chunks, 12),
            Err(LedgerError::CorruptionDetected { .. })
        ));
    }

    #[test]
    fn test_reassemble_detects_size_mismatch() {
        let chunks = split(&payload(12), 6).unwrap();
        assert!(matches!(
            reassemble("FILE_SIZE", chunks, 13),
            Err(LedgerError::CorruptionDetected { .. })
        ));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"roof"), content_hash(b"roof"));
        assert_ne!(content_hash(b"roof"), content_hash(b"wall"));
        assert_eq!(content_hash(b"").len(), 16);
    }
}
