pub mod json;
pub mod table;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Print `value` as JSON, or through `human_fn` for people.
pub fn print<T, F>(mode: OutputMode, value: &T, human_fn: F)
where
    T: Serialize + ?Sized,
    F: FnOnce(&T),
{
    match mode {
        OutputMode::Human => human_fn(value),
        OutputMode::Json => json::print_json(value),
    }
}
