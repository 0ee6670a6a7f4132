//! Flat-file I/O shared by the offline commands.

use crate::Result;
use ohno::IntoAppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::Path;

/// Read one JSON document per non-empty line.
pub(crate) fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = std::fs::read_to_string(path).into_app_err_with(|| format!("unable to read {}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).into_app_err_with(|| format!("invalid JSON on line {} of {}", index + 1, path.display()))
        })
        .collect()
}

/// Write one JSON document per line to the output file, or stdout when absent.
pub(crate) fn write_json_lines<T: Serialize>(output: Option<&Path>, values: impl IntoIterator<Item = T>) -> Result<()> {
    let mut buffer = String::new();
    for value in values {
        buffer.push_str(&serde_json::to_string(&value).into_app_err("unable to encode output")?);
        buffer.push('\n');
    }

    write_output(output, &buffer)
}

pub(crate) fn write_output(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, contents).into_app_err_with(|| format!("unable to write {}", path.display()))
        }
        None => std::io::stdout()
            .write_all(contents.as_bytes())
            .into_app_err("unable to write to stdout"),
    }
}
