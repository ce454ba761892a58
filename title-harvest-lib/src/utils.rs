//! Helpers for building task lists.
//!
//! Parsing URL lists from text, checking identifiers look fetchable, and
//! repeating a list to stress the aggregators with duplicate keys.

use crate::error::HarvestError;
use crate::types::Task;
use std::fs;
use std::path::Path;

/// URLs used when the caller supplies none.
pub const DEFAULT_URLS: &[&str] = &[
    "https://github.com",
    "https://go.dev",
    "https://gobyexample.com",
];

/// Basic sanity check on a task identifier.
///
/// Only rejects things that can never be fetched over HTTP; everything else
/// is left to the fetcher to fail on.
pub fn validate_url(url: &str) -> Result<(), HarvestError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(HarvestError::invalid_url(url, "URL cannot be empty"));
    }

    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| HarvestError::invalid_url(url, "URL must start with http:// or https://"))?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(HarvestError::invalid_url(url, "URL has no host"));
    }

    if url.chars().any(char::is_whitespace) {
        return Err(HarvestError::invalid_url(url, "URL contains whitespace"));
    }

    Ok(())
}

/// Parse a URL list: one per line, blank lines and `#` comments ignored.
///
/// Inline comments after a URL are stripped. Invalid lines are returned as
/// errors alongside their 1-based line number.
pub fn parse_url_list(content: &str) -> (Vec<String>, Vec<(usize, HarvestError)>) {
    let mut urls = Vec::new();
    let mut invalid = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Only whitespace-separated '#' starts a comment; URL fragments stay.
        let line = match line.find(" #") {
            Some(end) => line[..end].trim_end(),
            None => line,
        };

        match validate_url(line) {
            Ok(()) => urls.push(line.to_string()),
            Err(e) => invalid.push((index + 1, e)),
        }
    }

    (urls, invalid)
}

/// Read a URL list file.
///
/// # Errors
///
/// Returns `HarvestError::File` if the file cannot be read or contains no
/// valid URLs. Invalid lines are skipped.
pub fn read_url_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, HarvestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        HarvestError::file_error(path.to_string_lossy(), format!("Failed to read file: {}", e))
    })?;

    let (urls, invalid) = parse_url_list(&content);
    for (line, e) in &invalid {
        tracing::warn!(path = %path.display(), line, error = %e, "skipping invalid URL");
    }

    if urls.is_empty() {
        return Err(HarvestError::file_error(
            path.to_string_lossy(),
            "No valid URLs found in file",
        ));
    }

    Ok(urls)
}

/// Build the task list, repeating `urls` `repeat` times.
///
/// `repeat == 0` yields an empty list.
pub fn build_tasks(urls: &[String], repeat: usize) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(urls.len().saturating_mul(repeat));
    for _ in 0..repeat {
        tasks.extend(urls.iter().map(|url| Task::new(url.as_str())));
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://go.dev").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/path").is_ok());
        assert!(validate_url("").is_err());
        assert!(validate_url("go.dev").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("https:///path").is_err());
        assert!(validate_url("https://exa mple.com").is_err());
    }

    #[test]
    fn test_parse_url_list_skips_comments() {
        let content = "# header\nhttps://go.dev\n\n  https://github.com  # inline\nnot-a-url\nhttps://go.dev/doc#install\n";
        let (urls, invalid) = parse_url_list(content);

        assert_eq!(
            urls,
            vec!["https://go.dev", "https://github.com", "https://go.dev/doc#install"]
        );
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].0, 5);
    }

    #[test]
    fn test_read_url_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "https://go.dev\n# comment\nhttps://gobyexample.com").unwrap();

        let urls = read_url_file(file.path()).unwrap();
        assert_eq!(urls, vec!["https://go.dev", "https://gobyexample.com"]);
    }

    #[test]
    fn test_read_url_file_without_urls_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        assert!(matches!(
            read_url_file(file.path()),
            Err(HarvestError::File { .. })
        ));
        assert!(read_url_file("/definitely/not/here.txt").is_err());
    }

    #[test]
    fn test_build_tasks_repeats() {
        let urls = vec!["https://a.test".to_string(), "https://b.test".to_string()];
        let tasks = build_tasks(&urls, 3);

        assert_eq!(tasks.len(), 6);
        assert_eq!(tasks[0].url(), "https://a.test");
        assert_eq!(tasks[5].url(), "https://b.test");
        assert!(build_tasks(&urls, 0).is_empty());
    }
}
