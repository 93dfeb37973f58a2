//! Intermediate block table and normalization into canonical rows.
//!
//! The per-block table is written next to the source log (`<log><suffix>`)
//! with the header `BlockID,bct,BlockSize,Priority,Deadline`. Other tools
//! read this file, so the column names and order are fixed.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::block_id::decode_block_id;
use super::error::TableError;
use super::log_parser::BLOCK_FIELDS;
use super::types::*;

/// Default suffix appended to the log path for the block table
pub const DEFAULT_TABLE_SUFFIX: &str = ".csv";

/// Path of the block table for a log: the log path with `suffix` appended
pub fn table_path_for(log_path: &Path, suffix: &str) -> PathBuf {
    let mut path = log_path.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Write block records as the intermediate table.
///
/// The header is written even when there are no records.
pub fn write_block_table(path: &Path, blocks: &[BlockRecord]) -> Result<(), TableError> {
    let csv_err = |source| TableError::Csv {
        file: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(|source| TableError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer.write_record(BLOCK_FIELDS).map_err(csv_err)?;
    for block in blocks {
        writer.serialize(block).map_err(csv_err)?;
    }

    writer.flush().map_err(|source| TableError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Read an intermediate table back into block records
pub fn read_block_table(path: &Path) -> Result<Vec<BlockRecord>, TableError> {
    let csv_err = |source| TableError::Csv {
        file: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?;
    if !headers.iter().eq(BLOCK_FIELDS) {
        return Err(TableError::Header {
            file: path.to_path_buf(),
            found: headers.iter().map(str::to_string).collect(),
            expected: BLOCK_FIELDS.iter().map(|s| s.to_string()).collect(),
        });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<BlockRecord>, _>>()
        .map_err(csv_err)
}

/// Map one raw record to a canonical row
pub fn normalize_block(block: &BlockRecord) -> NormalizedRow {
    NormalizedRow {
        block_id: decode_block_id(block.raw_block_id),
        completion_time: block.block_completion_time,
        size: block.block_size,
        priority: Priority::from(block.priority),
        deadline: block.deadline,
        duration: None,
    }
}

/// Normalize raw records, keeping their order
pub fn normalize_blocks(blocks: &[BlockRecord]) -> NormalizedRun {
    NormalizedRun {
        rows: blocks.iter().map(normalize_block).collect(),
    }
}

/// Normalize the block table at `path`.
///
/// A table that cannot be read yields an empty run; the cause is logged
/// here and not propagated.
pub fn normalize_table(path: &Path) -> NormalizedRun {
    match read_block_table(path) {
        Ok(blocks) => normalize_blocks(&blocks),
        Err(e) => {
            log::error!("{}", e);
            NormalizedRun::default()
        }
    }
}
