//! modlog-storage - Storage library for modlog
//!
//! This crate provides the file system implementation of the board storage.

mod board_store;

pub use board_store::FileSystemStorage;
