//! Dataset naming helpers.
//!
//! Names are opaque to zfsutil; hierarchy and character rules belong to the
//! host tools and are not validated here.

/// Separator between a dataset and a snapshot name.
pub const SNAPSHOT_SEPARATOR: char = '@';

/// Build `<dataset>@<snapshot>`.
pub fn snapshot_reference(dataset: &str, snapshot: &str) -> String {
    let mut reference = String::with_capacity(dataset.len() + snapshot.len() + 1);
    reference.push_str(dataset);
    reference.push(SNAPSHOT_SEPARATOR);
    reference.push_str(snapshot);
    reference
}

/// Split captured tool output into records, one per line feed, skipping empty lines.
pub fn split_lines(payload: &str) -> Vec<String> {
    payload
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
