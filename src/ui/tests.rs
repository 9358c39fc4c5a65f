use std::sync::Arc;
use std::time::SystemTime;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::action::Action;
use crate::app::App;
use crate::config::Config;
use crate::metrics::snapshot::{
    CpuInfo, DiskInfo, MemoryInfo, NetworkInfo, ProcessInfo, Snapshot,
};
use crate::metrics::store::SnapshotStore;
use crate::ui::theme::Theme;
use crate::ui::{devices, draw, help, statusbar};

fn buffer_to_string(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            let cell = buf.cell((x, y)).unwrap();
            out.push_str(cell.symbol());
        }
        if y + 1 < area.height {
            out.push('\n');
        }
    }
    out
}

fn render_to_string<F>(width: u16, height: u16, draw: F) -> String
where
    F: FnOnce(&mut ratatui::Frame),
{
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    let buf = terminal.backend().buffer();
    buffer_to_string(buf)
}

fn make_process(pid: u32, name: &str, memory: u64, cpu: f32) -> ProcessInfo {
    ProcessInfo {
        pid,
        name: name.to_string(),
        command: format!("{name} --flag"),
        memory_bytes: memory,
        cpu_percent: cpu,
        thread_count: Some(4),
        status: "Run".to_string(),
        user: Some("user".to_string()),
        ..ProcessInfo::default()
    }
}

fn make_snapshot() -> Snapshot {
    Snapshot {
        timestamp: SystemTime::now(),
        processes: vec![
            make_process(1, "init", 8 * 1024 * 1024, 0.5),
            make_process(42, "firefox", 900 * 1024 * 1024, 37.0),
        ],
        memory: MemoryInfo {
            total: 16 * 1024 * 1024 * 1024,
            used: 8 * 1024 * 1024 * 1024,
            available: 8 * 1024 * 1024 * 1024,
            swap_total: 0,
            swap_used: 0,
        },
        cpu: CpuInfo {
            brand: "Test CPU".to_string(),
            logical_cores: 8,
            usage_percent: 25.0,
            ..CpuInfo::default()
        },
        networks: vec![NetworkInfo {
            interface: "eth0".to_string(),
            receive_rate_bps: 2048,
            ..NetworkInfo::default()
        }],
        disks: vec![DiskInfo {
            mount_point: "/".to_string(),
            total_space: 100,
            available_space: 25,
            ..DiskInfo::default()
        }],
        uptime_seconds: 3_725,
        total_processes: 2,
        total_threads: 8,
    }
}

fn app_with(snapshot: Option<Snapshot>) -> App {
    let store = Arc::new(SnapshotStore::new(16));
    if let Some(snapshot) = snapshot {
        store.record(snapshot);
    }
    App::new(&Config::default(), store)
}

#[test]
fn empty_store_renders_waiting_placeholder() {
    let app = app_with(None);
    let out = render_to_string(100, 24, |f| draw(f, &app));
    assert!(out.contains("Waiting for first sample"));
    assert!(out.contains("CPU"));
}

#[test]
fn dashboard_shows_processes_in_cpu_order() {
    let app = app_with(Some(make_snapshot()));
    let out = render_to_string(120, 30, |f| draw(f, &app));
    assert!(out.contains("Processes: 2"));
    assert!(out.contains("Sort: CPU"));
    let firefox = out.find("firefox").unwrap();
    let init = out.find("init").unwrap();
    assert!(firefox < init);
    assert!(out.contains("up 01h 02m"));
    assert!(out.contains("peak 50%"));
}

#[test]
fn devices_list_interfaces_and_mounts() {
    let snapshot = make_snapshot();
    let theme = Theme::default();
    let out = render_to_string(100, 6, |f| {
        devices::render(f, Rect::new(0, 0, 100, 6), &snapshot, &theme)
    });
    assert!(out.contains("eth0"));
    assert!(out.contains("2 KB/s"));
    assert!(out.contains("75%"));
}

#[test]
fn statusbar_names_current_sort() {
    let mut app = app_with(Some(make_snapshot()));
    app.dispatch(Action::CycleSort);
    let theme = Theme::default();
    let out = render_to_string(80, 1, |f| {
        statusbar::render(f, Rect::new(0, 0, 80, 1), &app, &theme)
    });
    assert!(out.contains("Memory"));
    assert!(out.contains("sampled"));
    assert!(out.contains("Test CPU"));
}

#[test]
fn statusbar_shows_filter_while_editing_and_after() {
    let mut app = app_with(Some(make_snapshot()));
    let theme = Theme::default();
    let bar = |app: &App| {
        render_to_string(120, 1, |f| {
            statusbar::render(f, Rect::new(0, 0, 120, 1), app, &theme)
        })
    };

    app.dispatch(Action::StartFilter);
    app.dispatch(Action::FilterInput('f'));
    app.dispatch(Action::FilterInput('i'));
    assert!(bar(&app).contains("/fi_"));

    app.dispatch(Action::FilterConfirm);
    assert!(bar(&app).contains("filter: fi"));

    let out = render_to_string(120, 30, |f| draw(f, &app));
    assert!(out.contains("firefox"));
    assert!(!out.contains("init"));
}

#[test]
fn table_title_shows_sort_direction() {
    let mut app = app_with(Some(make_snapshot()));
    let out = render_to_string(120, 30, |f| draw(f, &app));
    assert!(out.contains("Sort: CPU \u{2193}"));
    app.dispatch(Action::ToggleReverse);
    let out = render_to_string(120, 30, |f| draw(f, &app));
    assert!(out.contains("Sort: CPU \u{2191}"));
}

#[test]
fn help_overlay_lists_keys() {
    let app = app_with(None);
    let theme = Theme::default();
    let entries = app.help_entries();
    let out = render_to_string(60, 12, |f| {
        help::render(f, Rect::new(0, 0, 60, 12), &entries, &theme)
    });
    assert!(out.contains("Keys"));
    assert!(out.contains("Cycle sort mode"));
    assert!(out.contains("Ctrl+C"));
}
