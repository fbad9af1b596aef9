//! Screenshot capture: timestamped, collision-resistant file names under the
//! results directory. Stateless; callers treat failures here as non-fatal.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::session::Session;
use crate::Result;

const MAX_NAME_LEN: usize = 50;

/// Capture a full-page screenshot named after `name`, returning the absolute
/// path of the written image.
pub async fn capture(session: &Session, dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let file_name = format!(
        "{}_{}.png",
        sanitize_name(name),
        Local::now().format("%Y%m%d_%H%M%S_%3f")
    );
    let path = dir.join(file_name);
    session.screenshot(&path, true).await?;

    Ok(std::path::absolute(&path)?)
}

/// Replace characters that are unsafe in file names and cap the length.
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "unknown".to_string();
    }
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .take(MAX_NAME_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_spaces_and_punctuation() {
        assert_eq!(
            sanitize_name("Successful login: valid credentials"),
            "Successful_login__valid_credentials"
        );
    }

    #[test]
    fn sanitize_keeps_hyphens_and_digits() {
        assert_eq!(sanitize_name("run-42"), "run-42");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(120);
        assert_eq!(sanitize_name(&long).len(), MAX_NAME_LEN);
    }

    #[test]
    fn sanitize_handles_empty_input() {
        assert_eq!(sanitize_name(""), "unknown");
    }
}
