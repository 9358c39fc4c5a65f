use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::Action;
use crate::config::Config;
use crate::metrics::snapshot::{ProcessInfo, Snapshot};
use crate::metrics::store::SnapshotStore;

const HISTORY_WINDOWS: [Duration; 3] = [
    Duration::from_secs(60),
    Duration::from_secs(300),
    Duration::from_secs(900),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Cpu,
    Memory,
    Threads,
    Pid,
    Name,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Cpu => SortMode::Memory,
            SortMode::Memory => SortMode::Threads,
            SortMode::Threads => SortMode::Pid,
            SortMode::Pid => SortMode::Name,
            SortMode::Name => SortMode::Cpu,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Cpu => "CPU",
            SortMode::Memory => "Memory",
            SortMode::Threads => "Threads",
            SortMode::Pid => "PID",
            SortMode::Name => "Name",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => SortMode::Memory,
            "threads" | "thread" => SortMode::Threads,
            "pid" => SortMode::Pid,
            "name" => SortMode::Name,
            _ => SortMode::Cpu,
        }
    }

    /// Largest-first for load columns, smallest-first for identifiers.
    pub fn descending_by_default(self) -> bool {
        matches!(self, SortMode::Cpu | SortMode::Memory | SortMode::Threads)
    }

    fn compare(self, a: &ProcessInfo, b: &ProcessInfo) -> Ordering {
        match self {
            SortMode::Cpu => a
                .cpu_percent
                .partial_cmp(&b.cpu_percent)
                .unwrap_or(Ordering::Equal),
            SortMode::Memory => a.memory_bytes.cmp(&b.memory_bytes),
            SortMode::Threads => a
                .thread_count
                .unwrap_or(0)
                .cmp(&b.thread_count.unwrap_or(0)),
            SortMode::Pid => a.pid.cmp(&b.pid),
            SortMode::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    }
}

/// Presenter state. Only ever reads from the store.
pub struct App {
    pub running: bool,
    store: Arc<SnapshotStore>,
    pub snapshot: Snapshot,
    /// CPU usage per history entry, in hundredths of a percent.
    pub cpu_history: Vec<u64>,
    /// Memory load per history entry, in hundredths of a percent.
    pub memory_history: Vec<u64>,
    pub history_window: Duration,
    pub sort_mode: SortMode,
    pub sort_reverse: bool,
    /// Case-insensitive substring matched against process names.
    pub filter: String,
    pub filter_editing: bool,
    pub show_help: bool,
    pub max_processes: usize,
}

impl App {
    pub fn new(config: &Config, store: Arc<SnapshotStore>) -> Self {
        let mut app = App {
            running: true,
            store,
            snapshot: Snapshot::default(),
            cpu_history: Vec::new(),
            memory_history: Vec::new(),
            history_window: config.history_window(),
            sort_mode: SortMode::from_str_config(&config.general.default_sort),
            sort_reverse: false,
            filter: String::new(),
            filter_editing: false,
            show_help: false,
            max_processes: config.general.max_processes,
        };
        app.refresh_data();
        app
    }

    pub fn refresh_data(&mut self) {
        self.snapshot = self.store.latest();
        let history = self.store.history(self.history_window);
        self.cpu_history = history
            .iter()
            .map(|s| (s.cpu.usage_percent * 100.0).max(0.0) as u64)
            .collect();
        self.memory_history = history
            .iter()
            .map(|s| (s.memory.load_percent() * 100.0) as u64)
            .collect();
    }

    pub fn is_waiting(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Whether the primary sort key currently runs largest-first.
    pub fn sort_descending(&self) -> bool {
        self.sort_mode.descending_by_default() != self.sort_reverse
    }

    /// Processes matching the filter in the current sort order, capped at
    /// `max_processes`. Ties always fall back to ascending pid.
    pub fn visible_processes(&self) -> Vec<&ProcessInfo> {
        let needle = self.filter.to_lowercase();
        let mut procs: Vec<&ProcessInfo> = self
            .snapshot
            .processes
            .iter()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .collect();
        let descending = self.sort_descending();
        procs.sort_by(|a, b| {
            let primary = self.sort_mode.compare(a, b);
            let primary = if descending { primary.reverse() } else { primary };
            primary.then(a.pid.cmp(&b.pid))
        });
        if self.max_processes > 0 {
            procs.truncate(self.max_processes);
        }
        procs
    }

    pub fn map_key(&self, key: KeyEvent) -> Action {
        // Ctrl+C always quits
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        if self.filter_editing {
            return match key.code {
                KeyCode::Enter => Action::FilterConfirm,
                KeyCode::Esc => Action::FilterCancel,
                KeyCode::Backspace => Action::FilterBackspace,
                KeyCode::Char(c) => Action::FilterInput(c),
                _ => Action::None,
            };
        }

        if self.show_help {
            return match key.code {
                KeyCode::Char('?') | KeyCode::Esc => Action::ToggleHelp,
                KeyCode::Char('q') => Action::Quit,
                _ => Action::None,
            };
        }

        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('s') => Action::CycleSort,
            KeyCode::Char('w') => Action::CycleWindow,
            KeyCode::Char('r') => Action::ToggleReverse,
            KeyCode::Char('/') => Action::StartFilter,
            KeyCode::Char('?') => Action::ToggleHelp,
            _ => Action::None,
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::CycleSort => {
                self.sort_mode = self.sort_mode.next();
                self.sort_reverse = false;
            }
            Action::ToggleReverse => self.sort_reverse = !self.sort_reverse,
            Action::CycleWindow => {
                self.history_window = next_window(self.history_window);
                self.refresh_data();
            }
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::StartFilter => self.filter_editing = true,
            Action::FilterInput(c) => self.filter.push(c),
            Action::FilterBackspace => {
                self.filter.pop();
            }
            Action::FilterConfirm => self.filter_editing = false,
            Action::FilterCancel => {
                self.filter.clear();
                self.filter_editing = false;
            }
            Action::None => {}
        }
    }

    pub fn help_entries(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("q", "Quit"),
            ("s", "Cycle sort mode"),
            ("w", "Cycle history window"),
            ("r", "Reverse sort order"),
            ("/", "Filter by name (Enter keep, Esc clear)"),
            ("?", "Toggle help"),
            ("Ctrl+C", "Quit (always)"),
        ]
    }
}

fn next_window(current: Duration) -> Duration {
    HISTORY_WINDOWS
        .iter()
        .copied()
        .find(|w| *w > current)
        .unwrap_or(HISTORY_WINDOWS[0])
}
