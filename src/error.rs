use rusqlite::Error as RusqliteError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaLaunchError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error), // Converts io::Error into MediaLaunchError automatically

    #[error("Database error: {0}")]
    DatabaseError(#[from] RusqliteError), // Converts rusqlite::Error automatically

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}
