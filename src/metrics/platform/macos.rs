use std::collections::HashMap;

use libproc::libproc::proc_pid::pidinfo;
use libproc::libproc::task_info::TaskInfo;

use super::{PlatformExtensions, ProcessDetails};

pub struct Platform;

fn nice_value(pid: u32) -> Option<i32> {
    // errno must be cleared first: -1 is both a valid priority and the error value
    unsafe { *libc::__error() = 0 };
    let prio = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) };
    let errno = unsafe { *libc::__error() };
    if prio == -1 && errno != 0 {
        None
    } else {
        Some(prio)
    }
}

impl PlatformExtensions for Platform {
    fn process_details(pids: &[u32]) -> HashMap<u32, ProcessDetails> {
        pids.iter()
            .filter_map(|&pid| {
                let threads = pidinfo::<TaskInfo>(pid as i32, 0)
                    .ok()
                    .and_then(|info| u32::try_from(info.pti_threadnum).ok());
                let priority = nice_value(pid);
                if threads.is_none() && priority.is_none() {
                    return None;
                }
                Some((pid, ProcessDetails { threads, priority }))
            })
            .collect()
    }
}
