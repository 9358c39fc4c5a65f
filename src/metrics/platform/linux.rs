use std::collections::HashMap;

use super::{PlatformExtensions, ProcessDetails};

pub struct Platform;

/// Parses `/proc/{pid}/stat` contents: fields after the parenthesised comm
/// are state(0) ppid(1) ... priority(15) nice(16) num_threads(17).
fn parse_stat(contents: &str) -> Option<ProcessDetails> {
    // comm may itself contain spaces and parens
    let after_comm = contents.rfind(')')? + 1;
    let fields: Vec<&str> = contents[after_comm..].split_whitespace().collect();
    Some(ProcessDetails {
        threads: fields.get(17).and_then(|f| f.parse().ok()),
        priority: fields.get(15).and_then(|f| f.parse().ok()),
    })
}

impl PlatformExtensions for Platform {
    fn process_details(pids: &[u32]) -> HashMap<u32, ProcessDetails> {
        pids.iter()
            .filter_map(|&pid| {
                let contents = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
                parse_stat(&contents).map(|details| (pid, details))
            })
            .collect()
    }
}
