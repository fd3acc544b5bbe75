pub mod detector;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::core::Target;

/// Reads the input list: one URL per line, trimmed, blank lines skipped.
/// Duplicates are kept in place.
pub fn read_targets(path: impl AsRef<Path>) -> io::Result<Vec<Target>> {
    let file = File::open(path.as_ref())?;
    parse_targets(BufReader::new(file))
}

pub fn parse_targets(reader: impl BufRead) -> io::Result<Vec<Target>> {
    let mut targets = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            targets.push(Target::new(trimmed));
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_trims_and_skips_blank_lines() {
        let input = "  https://a.test/app.js \n\n\t\nhttps://b.test/x.js\r\nhttps://a.test/app.js";
        let targets = parse_targets(Cursor::new(input)).unwrap();

        assert_eq!(
            targets,
            vec![
                Target::new("https://a.test/app.js"),
                Target::new("https://b.test/x.js"),
                Target::new("https://a.test/app.js"),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_targets(dir.path().join("nope.txt")).is_err());
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let bytes: &[u8] = b"https://a.test/\n\xff\xfe\n";
        assert!(parse_targets(Cursor::new(bytes)).is_err());
    }
}
