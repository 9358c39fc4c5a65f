use std::collections::{HashMap, HashSet};

use windows_sys::Win32::Foundation::{CloseHandle, INVALID_HANDLE_VALUE};
use windows_sys::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};

use super::{PlatformExtensions, ProcessDetails};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_details(pids: &[u32]) -> HashMap<u32, ProcessDetails> {
        let wanted: HashSet<u32> = pids.iter().copied().collect();
        let mut details = HashMap::with_capacity(wanted.len());
        // One toolhelp snapshot carries thread count and base priority for
        // every process, so walk it once.
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
            if snapshot == INVALID_HANDLE_VALUE {
                return details;
            }
            let mut entry = std::mem::zeroed::<PROCESSENTRY32W>();
            entry.dwSize = std::mem::size_of::<PROCESSENTRY32W>() as u32;
            let mut ok = Process32FirstW(snapshot, &mut entry);
            while ok != 0 {
                if wanted.contains(&entry.th32ProcessID) {
                    details.insert(
                        entry.th32ProcessID,
                        ProcessDetails {
                            threads: Some(entry.cntThreads),
                            priority: Some(entry.pcPriClassBase),
                        },
                    );
                }
                ok = Process32NextW(snapshot, &mut entry);
            }
            CloseHandle(snapshot);
        }
        details
    }
}
