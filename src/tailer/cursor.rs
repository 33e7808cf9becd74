//! Resume cursor for incremental tailing.

/// Where the previous scan stopped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumeCursor {
    /// Name of the file scanned last; `None` before the first scan.
    pub file_name: Option<String>,
    /// Text of the last fully processed line.
    pub last_line: Option<String>,
    /// Index of that line within the file.
    pub line_index: usize,
}

/// How a scan treats the lines of the active file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// First scan of the process: arm the cursor without folding anything.
    Baseline,
    /// Fold every line from this index on.
    From(usize),
}

impl ResumeCursor {
    /// Decide where folding starts in `lines`, the contents of `file_name`.
    ///
    /// A different file name means the log rotated and the whole file is
    /// new. On the same file the stored index is checked first, then the
    /// first line with the stored text; if neither matches the whole file is
    /// processed again, which can double count across a truncation.
    pub fn resume_point(&self, file_name: &str, lines: &[String]) -> ResumePoint {
        let Some(previous) = &self.file_name else {
            return ResumePoint::Baseline;
        };
        if previous != file_name {
            return ResumePoint::From(0);
        }
        let Some(last) = &self.last_line else {
            return ResumePoint::From(0);
        };

        if lines.get(self.line_index) == Some(last) {
            return ResumePoint::From(self.line_index + 1);
        }

        match lines.iter().position(|line| line == last) {
            Some(index) => ResumePoint::From(index + 1),
            None => {
                tracing::warn!(
                    "Last processed line not found in {}, rescanning whole file",
                    file_name
                );
                ResumePoint::From(0)
            }
        }
    }

    /// Switch to `file_name`, forgetting the line position if it changed.
    pub fn open(&mut self, file_name: &str) {
        if self.file_name.as_deref() != Some(file_name) {
            self.file_name = Some(file_name.to_string());
            self.last_line = None;
            self.line_index = 0;
        }
    }

    /// Mark a line as fully processed.
    pub fn advance(&mut self, index: usize, line: &str) {
        self.line_index = index;
        self.last_line = Some(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn cursor(file: &str, last: &str, index: usize) -> ResumeCursor {
        ResumeCursor {
            file_name: Some(file.to_string()),
            last_line: Some(last.to_string()),
            line_index: index,
        }
    }

    #[test]
    fn test_first_scan_is_baseline() {
        let c = ResumeCursor::default();
        assert_eq!(c.resume_point("a.txt", &lines(&["x"])), ResumePoint::Baseline);
    }

    #[test]
    fn test_rotation_starts_from_top() {
        let c = cursor("a.txt", "x", 0);
        assert_eq!(c.resume_point("b.txt", &lines(&["x", "y"])), ResumePoint::From(0));
    }

    #[test]
    fn test_resume_by_index() {
        let c = cursor("a.txt", "dup", 2);
        let file = lines(&["dup", "other", "dup", "new"]);
        assert_eq!(c.resume_point("a.txt", &file), ResumePoint::From(3));
    }

    #[test]
    fn test_resume_by_text_when_index_moved() {
        let c = cursor("a.txt", "b", 5);
        assert_eq!(
            c.resume_point("a.txt", &lines(&["a", "b", "c"])),
            ResumePoint::From(2)
        );
    }

    #[test]
    fn test_missing_line_rescans_everything() {
        let c = cursor("a.txt", "gone", 1);
        assert_eq!(
            c.resume_point("a.txt", &lines(&["a", "b"])),
            ResumePoint::From(0)
        );
    }

    #[test]
    fn test_open_resets_only_on_change() {
        let mut c = cursor("a.txt", "x", 3);
        c.open("a.txt");
        assert_eq!(c.last_line.as_deref(), Some("x"));

        c.open("b.txt");
        assert_eq!(c.file_name.as_deref(), Some("b.txt"));
        assert_eq!(c.last_line, None);
        assert_eq!(c.line_index, 0);
    }
}
