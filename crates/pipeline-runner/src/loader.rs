use std::fs;
use std::path::Path;

use crate::errors::LoadError;
use crate::parser::{parse_program, LoadedProgram};

/// Reads and tokenizes a program file.
///
/// # Errors
///
/// Returns [`LoadError::Io`] when the file cannot be read and
/// [`LoadError::Decode`] for the first line that fails to tokenize.
pub fn load_program(path: &Path) -> Result<LoadedProgram, LoadError> {
    let text = fs::read_to_string(path).map_err(|error| LoadError::Io {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    let loaded = parse_program(path, &text)?;
    if loaded.program.is_empty() {
        tracing::warn!(path = %path.display(), "no instructions found");
    } else {
        tracing::debug!(
            path = %path.display(),
            instructions = loaded.program.len(),
            "program loaded"
        );
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::load_program;
    use crate::errors::LoadError;

    #[test]
    fn loads_plain_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("prog.p86");
        fs::write(&path, "MOV AX 1\nHLT\n").expect("program should be written");

        let loaded = load_program(&path).expect("program should load");
        assert_eq!(loaded.program.len(), 2);
        assert_eq!(loaded.locations[1].line, 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let error = load_program(&dir.path().join("absent.p86")).expect_err("file is absent");
        assert!(matches!(error, LoadError::Io { .. }));
    }
}
