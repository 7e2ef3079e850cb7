// SPDX-License-Identifier: MIT
use std::io;
use std::path::Path;

/// Next free session index for files named `{prefix}{N}{suffix}` in `dir`:
/// one past the highest existing index, starting at 1.
///
/// # Errors
///
/// Returns an error if `dir` exists but cannot be listed.
pub fn next_session_index(dir: &Path, prefix: &str, suffix: &str) -> io::Result<u32> {
    if !dir.exists() {
        return Ok(1);
    }

    let mut highest = 0;
    for entry in std::fs::read_dir(dir)?.flatten() {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if let Some(rest) = name_str.strip_prefix(prefix)
            && let Some(idx_str) = rest.strip_suffix(suffix)
            && !idx_str.is_empty()
            && idx_str.bytes().all(|b| b.is_ascii_digit())
            && let Ok(idx) = idx_str.parse::<u32>()
        {
            highest = highest.max(idx);
        }
    }
    Ok(highest.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dir_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("Data");
        assert_eq!(next_session_index(&missing, "LightLog", ".csv").unwrap(), 1);
    }

    #[test]
    fn picks_one_past_highest_matching() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "LightLog1.csv",
            "LightLog7.csv",
            "LightLog3.csv",
            "LightLog12.txt",
            "LightLogX.csv",
            "LightLog.csv",
            "OtherLog40.csv",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(
            next_session_index(dir.path(), "LightLog", ".csv").unwrap(),
            8
        );
    }
}
