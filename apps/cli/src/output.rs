//! Console rendering of listings.

use thunderdrive_api::Entry;
use thunderdrive_transfer::format_size;

/// One line per entry, numbered from 1, then a total line when any size
/// was known. The owner is shown only when it is not `me`.
pub fn entry_lines(entries: &[Entry], me: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    let mut total: u64 = 0;
    for (k, entry) in entries.iter().enumerate() {
        let size = match entry.file_size {
            Some(size) => {
                total += size;
                format_size(size)
            }
            None => "-".to_string(),
        };
        let owner = entry.owner_email().filter(|o| *o != me).unwrap_or("");
        lines.push(
            format!("{} {} ( {} {} ) {}", k + 1, entry.name, entry.kind, size, owner)
                .trim_end()
                .to_string(),
        );
    }
    if total > 0 {
        lines.push(format!("Total: {}", format_size(total)));
    }
    lines
}

pub fn print_entries(entries: &[Entry], me: &str) {
    for line in entry_lines(entries, me) {
        println!("{line}");
    }
}

/// Details printed by the browser's `i` command.
pub fn entry_info(entry: &Entry) -> Vec<String> {
    vec![
        format!("name: {}", entry.name),
        format!("file_size: {}", format_size(entry.file_size.unwrap_or(0))),
        format!("hash: {}", entry.hash),
        format!("id: {}", entry.id),
    ]
}
