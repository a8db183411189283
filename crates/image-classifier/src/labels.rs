//! Class label files

use std::path::Path;

use tracing::debug;

use crate::ClassifierError;

/// Parse one label per line, skipping blank lines
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_labels(path: &Path) -> Result<Vec<String>, ClassifierError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ClassifierError::Labels(format!("{}: {}", path.display(), e)))?;
    let labels = parse_labels(&text);
    if labels.is_empty() {
        return Err(ClassifierError::Labels(format!("{}: no labels", path.display())));
    }
    debug!("Loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_labels_trims_and_skips_blank() {
        let labels = parse_labels("tench\n  goldfish \n\r\n\ngreat white shark\r\n");
        assert_eq!(labels, vec!["tench", "goldfish", "great white shark"]);
    }

    #[test]
    fn test_load_labels_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tabby, tabby cat").unwrap();
        writeln!(file, "tiger cat").unwrap();

        let labels = load_labels(file.path()).unwrap();
        assert_eq!(labels, vec!["tabby, tabby cat", "tiger cat"]);
    }

    #[test]
    fn test_empty_label_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(load_labels(file.path()), Err(ClassifierError::Labels(_))));
    }

    #[test]
    fn test_missing_label_file() {
        let result = load_labels(Path::new("/nonexistent/labels.txt"));
        assert!(matches!(result, Err(ClassifierError::Labels(_))));
    }
}
