//! huddle-board specific configuration

use std::path::PathBuf;

/// Board service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: String,
    pub coach_url: String,
}
