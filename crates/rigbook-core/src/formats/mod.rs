//! # Formats
//!
//! Byte-level encodings of catalog data. File I/O lives in the app layer.

pub mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_SIZE, Snapshot, SnapshotHeader, TableDump, snapshot_from_bytes, snapshot_to_bytes,
};
