mod hash;

pub use hash::compute_bytes_hash;

use std::path::{Path, PathBuf};

/// The name of the importer folder inside a workspace
pub const IMPORTER_FOLDER: &str = ".importer";

/// The name of the entity store file
pub const STORE_FILE: &str = "store.json";

/// The name of the configuration file
pub const CONFIG_FILE: &str = "config.json";

/// Current importer version
pub const IMPORTER_VERSION: &str = "0.1.0";

/// Get the path to the .importer folder
pub fn get_importer_path(workspace_path: &Path) -> PathBuf {
    workspace_path.join(IMPORTER_FOLDER)
}

/// Get the path to the entity store file
pub fn get_store_path(workspace_path: &Path) -> PathBuf {
    get_importer_path(workspace_path).join(STORE_FILE)
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_store_path() {
        let workspace = Path::new("/test/workspace");
        assert_eq!(
            get_store_path(workspace),
            Path::new("/test/workspace/.importer/store.json")
        );
    }
}
