//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::Confirm;
use std::path::Path;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Ask before writing into an output directory that already has files.
///
/// Returns `true` without prompting when the directory is absent or empty,
/// or when `skip_prompt` is set.
pub fn confirm_overwrite(dir: &Path, skip_prompt: bool) -> Result<bool> {
    if skip_prompt || !directory_has_entries(dir) {
        return Ok(true);
    }
    confirm_step(&format!(
        "Output directory {} already has files. Overwrite?",
        dir.display()
    ))
}

fn directory_has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_or_empty_directory_needs_no_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(confirm_overwrite(temp_dir.path(), false).unwrap());
        assert!(confirm_overwrite(&temp_dir.path().join("absent"), false).unwrap());
    }

    #[test]
    fn test_skip_prompt_allows_populated_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("gmm_output.csv"), "x").unwrap();
        assert!(confirm_overwrite(temp_dir.path(), true).unwrap());
    }
}
