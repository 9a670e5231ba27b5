use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Seconds after which a lock left behind by a dead writer is reclaimed.
pub const STALE_LOCK_SECS: i64 = 60;

/// Write to a sibling temp file, fsync, then rename over `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let temp_path = dir.join(format!(".{}.tmp", temp_suffix()));

    let mut file = std::fs::File::create(&temp_path)
        .with_context(|| format!("cannot create temp file for {}", path.display()))?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e).with_context(|| format!("cannot rename temp to {}", path.display()));
    }
    Ok(())
}

/// `<path>.lock` holding the writer's pid and a unix timestamp.
#[derive(Debug)]
pub struct AdvisoryLock {
    lock_path: PathBuf,
}

impl AdvisoryLock {
    pub fn lock_path_for(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Fails while another live writer holds the lock.
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_path = Self::lock_path_for(path);

        if lock_path.exists() {
            let content = std::fs::read_to_string(&lock_path).unwrap_or_default();
            let held_since = content.lines().nth(1).and_then(|ts| ts.parse::<i64>().ok());
            match held_since {
                Some(ts) if chrono::Utc::now().timestamp() - ts > STALE_LOCK_SECS => {
                    let _ = std::fs::remove_file(&lock_path);
                }
                _ => bail!(
                    "dataset is locked by another process (lock: {})",
                    lock_path.display()
                ),
            }
        }

        let pid = std::process::id();
        let ts = chrono::Utc::now().timestamp();
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .with_context(|| format!("cannot acquire lock {}", lock_path.display()))?;
        write!(file, "{pid}\n{ts}\n")?;

        Ok(Self { lock_path })
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

fn temp_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}-{nanos:x}", std::process::id())
}
