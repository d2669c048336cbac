//! File system storage for the board

use fs2::FileExt;
use modlog_core::board::Board;
use modlog_core::error::{ModlogError, Result};
use modlog_core::store::{BoardFile, BoardFileRef, BoardStorage, StorageLock, CURRENT_SCHEMA_VERSION};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BOARD_FILE: &str = "board.json";
const TEMP_FILE: &str = ".board.json.tmp";
const LOCK_FILE: &str = ".board.lock";

/// Open lock file; the OS lock is dropped with it
struct LockFile {
    file: fs::File,
    path: PathBuf,
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {:?}: {}", self.path, e);
        }
    }
}

/// File system based board storage
pub struct FileSystemStorage {
    /// Directory holding the board document
    data_dir: PathBuf,
}

impl FileSystemStorage {
    /// Create a new file system storage
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self {
            data_dir: data_dir.into(),
        };

        storage.ensure_dirs()?;
        {
            // A writer in another process may own the temp file
            let _held = storage.lock()?;
            storage.clean_stale_temp();
        }
        Ok(storage)
    }

    /// Ensure required directories exist
    fn ensure_dirs(&self) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir).map_err(|e| {
                ModlogError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create data directory: {}", e),
                ))
            })?;
            debug!("Created data directory: {:?}", self.data_dir);
        }
        Ok(())
    }

    /// A temp file left by an interrupted write is never the current board
    fn clean_stale_temp(&self) {
        let temp_path = self.temp_path();
        if temp_path.exists() {
            match fs::remove_file(&temp_path) {
                Ok(()) => warn!("Removed stale temp file {:?}", temp_path),
                Err(e) => warn!("Failed to remove stale temp file {:?}: {}", temp_path, e),
            }
        }
    }

    /// Path of the board document
    pub fn board_path(&self) -> PathBuf {
        self.data_dir.join(BOARD_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.data_dir.join(TEMP_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }

    /// Get data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write the board atomically (write to temp, then rename)
    fn atomic_write(&self, board: &Board) -> Result<()> {
        let temp_path = self.temp_path();
        let final_path = self.board_path();

        let file = BoardFileRef::new(board);

        let temp_file = fs::File::create(&temp_path).map_err(|e| {
            ModlogError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create temp file: {}", e),
            ))
        })?;
        let mut writer = BufWriter::new(temp_file);
        serde_json::to_writer_pretty(&mut writer, &file)?;
        writer.flush()?;
        drop(writer);

        // Rename to final path (atomic on most filesystems)
        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ModlogError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to rename temp file: {}", e),
            ))
        })?;

        debug!(
            "Saved board ({} comments, {} changelog entries) to {:?}",
            board.comments.count(),
            board.changelog.len(),
            final_path
        );
        Ok(())
    }

    fn read_board(&self, path: &Path) -> Result<Board> {
        let file = fs::File::open(path)?;
        let reader = BufReader::new(file);
        let board_file: BoardFile = serde_json::from_reader(reader)
            .map_err(|e| ModlogError::from(e).with_context(format!("Failed to parse {:?}", path)))?;

        if board_file.schema_version != CURRENT_SCHEMA_VERSION {
            info!(
                "Reading board written with schema {} (current {})",
                board_file.schema_version, CURRENT_SCHEMA_VERSION
            );
        }
        board_file.into_board()
    }
}

impl BoardStorage for FileSystemStorage {
    fn load(&self) -> Result<Option<Board>> {
        let path = self.board_path();
        if !path.exists() {
            debug!("No board at {:?}", path);
            return Ok(None);
        }
        self.read_board(&path).map(Some)
    }

    fn save(&self, board: &Board) -> Result<()> {
        self.atomic_write(board)
    }

    fn lock(&self) -> Result<StorageLock> {
        let path = self.lock_path();
        let file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                ModlogError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to open lock file: {}", e),
                ))
            })?;
        FileExt::lock_exclusive(&file).map_err(|e| {
            ModlogError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to lock {:?}: {}", path, e),
            ))
        })?;
        debug!("Locked {:?}", path);
        Ok(StorageLock::holding(LockFile { file, path }))
    }
}
