use std::collections::HashMap;

/// Per-process values sysinfo does not expose uniformly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessDetails {
    pub threads: Option<u32>,
    pub priority: Option<i32>,
}

/// OS-specific process details, gathered in one pass per process.
pub trait PlatformExtensions {
    /// Details for the given pids. Pids the platform cannot inspect are
    /// simply absent from the map.
    fn process_details(pids: &[u32]) -> HashMap<u32, ProcessDetails>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(target_os = "macos")]
use macos as platform_impl;
#[cfg(target_os = "windows")]
use windows as platform_impl;

pub fn process_details(pids: &[u32]) -> HashMap<u32, ProcessDetails> {
    platform_impl::Platform::process_details(pids)
}
