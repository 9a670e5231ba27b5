use std::path::Path;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

const GENESIS: &str = "genesis";

fn line_hash(line: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(line.as_bytes()))
}

fn last_line(content: &str) -> Option<&str> {
    content.lines().rev().find(|line| !line.trim().is_empty())
}

/// Append a run entry to the ledger, chaining it to the previous line.
///
/// The entry gains `prev_hash` (SHA-256 of the previous line, or "genesis")
/// and `ts`. Returns the hash of the line just written.
pub fn append_entry(path: &Path, entry: &serde_json::Value) -> Result<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("cannot read ledger {}", path.display())),
    };

    let prev_hash = last_line(&content)
        .map(line_hash)
        .unwrap_or_else(|| GENESIS.to_string());

    let mut entry = entry.clone();
    let Some(obj) = entry.as_object_mut() else {
        bail!("ledger entries must be JSON objects");
    };
    obj.insert("prev_hash".into(), serde_json::Value::String(prev_hash));
    obj.insert(
        "ts".into(),
        serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
    );

    let line = serde_json::to_string(&entry)?;
    let hash = line_hash(&line);

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create ledger dir {}", dir.display()))?;
    }
    let mut new_content = content;
    if !new_content.is_empty() && !new_content.ends_with('\n') {
        new_content.push('\n');
    }
    new_content.push_str(&line);
    new_content.push('\n');
    std::fs::write(path, new_content)
        .with_context(|| format!("cannot write ledger {}", path.display()))?;

    Ok(hash)
}

/// Walk the ledger and check every `prev_hash` link.
///
/// Returns the number of entries.
pub fn verify_chain(path: &Path) -> Result<u64> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read ledger {}", path.display()))?;

    let mut count = 0u64;
    let mut prev_hash = GENESIS.to_string();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("invalid JSON at line {}", i + 1))?;
        let entry_prev = entry
            .get("prev_hash")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(GENESIS);
        if entry_prev != prev_hash {
            bail!(
                "hash chain broken at entry {count}: expected prev_hash '{prev_hash}', got '{entry_prev}'"
            );
        }
        prev_hash = line_hash(line);
        count += 1;
    }

    Ok(count)
}

/// Hash of the newest entry, or "genesis" for an empty ledger.
pub fn chain_head(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read ledger {}", path.display()))?;
    Ok(last_line(&content)
        .map(line_hash)
        .unwrap_or_else(|| GENESIS.to_string()))
}
