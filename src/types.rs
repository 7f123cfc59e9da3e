use serde::Serialize;
use std::fmt;

/// A single validation problem found in an annotation file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// File identifier, relative to the labels directory
    pub file: String,
    /// Line number (1-indexed), 0 for file-level problems
    pub line: usize,
    /// Offending line, trimmed (empty for file-level problems)
    pub text: String,
    /// Human-readable reason
    pub reason: String,
}

impl Finding {
    /// Finding tied to a specific line of a file
    pub fn at_line(file: &str, line: usize, text: &str, reason: impl ToString) -> Self {
        debug_assert!(line >= 1, "line findings are 1-indexed");
        Self {
            file: file.to_string(),
            line,
            text: text.trim().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Finding about the file as a whole (unreadable, undecodable)
    pub fn file_level(file: &str, reason: impl ToString) -> Self {
        Self {
            file: file.to_string(),
            line: 0,
            text: String::new(),
            reason: reason.to_string(),
        }
    }

    pub fn is_file_level(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} | '{}' | ERROR: {}",
            self.file, self.line, self.text, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_level_has_no_text() {
        let finding = Finding::file_level("train/a.txt", "invalid encoding");
        assert_eq!(finding.line, 0);
        assert!(finding.text.is_empty());
        assert!(finding.is_file_level());
    }

    #[test]
    fn test_at_line_trims_text() {
        let finding = Finding::at_line("a.txt", 3, "  0 0.5 0.5 0.2  \r", "bad");
        assert_eq!(finding.text, "0 0.5 0.5 0.2");
        assert!(!finding.is_file_level());
        assert_eq!(finding.to_string(), "a.txt:3 | '0 0.5 0.5 0.2' | ERROR: bad");
    }

    #[test]
    fn test_serializes_all_fields() {
        let finding = Finding::file_level("val/", "Directory read error: denied");
        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "file": "val/",
                "line": 0,
                "text": "",
                "reason": "Directory read error: denied",
            })
        );
    }
}
