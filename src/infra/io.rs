//! Document input and output: a file path, or the standard streams when none is given.

use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

use super::error::InfraError;

pub fn read_document(input: Option<&Path>) -> Result<String, InfraError> {
    match input {
        Some(path) => fs::read_to_string(path).map_err(|source| InfraError::Read {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut markdown = String::new();
            io::stdin().lock().read_to_string(&mut markdown)?;
            Ok(markdown)
        }
    }
}

/// Write the finished document. Only called once the whole run succeeded.
pub fn write_document(output: Option<&Path>, html: &str) -> Result<(), InfraError> {
    match output {
        Some(path) => fs::write(path, html).map_err(|source| InfraError::Write {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.html");
        write_document(Some(&path), "<p>hi</p>").expect("write");
        assert_eq!(read_document(Some(&path)).expect("read"), "<p>hi</p>");
    }

    #[test]
    fn missing_input_names_the_path() {
        let err = read_document(Some(Path::new("/nonexistent/report.md"))).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/report.md"), "{err}");
    }
}
