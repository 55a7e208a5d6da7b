use coursedb::ConnectionConfig;
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

/// A SQLite file under the system temp dir, removed on drop.
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new(label: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();

        let mut path = std::env::temp_dir();
        path.push(format!(
            "coursedb-{}-{}-{}.sqlite",
            label,
            std::process::id(),
            nanos
        ));
        Self { path }
    }

    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::sqlite(self.path.display().to_string())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
