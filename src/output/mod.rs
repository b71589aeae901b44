pub mod progress;
pub mod render;
pub mod styling;
pub mod tables;

use serde::Serialize;

use crate::config::OutputFormat;

pub use progress::TransferProgress;

/// Print a record as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `value` as JSON, or as the text `render` produces for it.
pub fn emit<T, F>(format: OutputFormat, value: &T, render: F) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Text => {
            println!("{}", render(value).trim_end());
            Ok(())
        }
    }
}
