pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Removes every file matching `pattern`. Missing files and bad patterns are ignored.
pub fn delete_all_files_by_glob(pattern: &str) {
    let Ok(paths) = glob::glob(pattern) else {
        return;
    };

    for path in paths.flatten() {
        let _ = std::fs::remove_file(path);
    }
}

/// Plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("things"));
        assert!(is_identifier("_things_2"));
        assert!(is_identifier("T"));

        assert!(!is_identifier(""));
        assert!(!is_identifier("2things"));
        assert!(!is_identifier("things; DROP TABLE x"));
        assert!(!is_identifier("thing-s"));
        assert!(!is_identifier("thïngs"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!("\"things\"", quote_identifier("things"));
        assert_eq!("\"a\"\"b\"", quote_identifier("a\"b"));
    }
}
