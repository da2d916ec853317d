//! One-shot generators for the prototype's input files.
//!
//! Both send a single prompt to the configured [`LanguageModel`](crate::llm::LanguageModel),
//! apply light text clean-up and write the result to disk. The output is
//! not validated; a bad CSV shows up as skipped rows when `chat` loads it.

pub mod customers;
pub mod policy;

use std::path::Path;

use anyhow::{Context, Result};

/// Write `content` to `path`, creating parent directories.
fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

/// Drop a surrounding Markdown code fence, if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if body.starts_with("```") {
        body = match body.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        };
    }
    if let Some(stripped) = body.trim_end().strip_suffix("```") {
        body = stripped;
    }
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```csv\na,b\n1,2\n```\n"), "a,b\n1,2");
        assert_eq!(strip_code_fence("  a,b\n1,2  "), "a,b\n1,2");
        assert_eq!(strip_code_fence("```"), "");
    }

    #[test]
    fn test_write_output_creates_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("out.txt");
        write_output(&path, "x").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x");
    }
}
