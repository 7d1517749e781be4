//! Integration tests for the polling engine
//!
//! These tests use temporary directories and real filesystem operations
//! to validate the engine's behavior in realistic scenarios.

use filetime::{set_file_mtime, FileTime};
use pollwatch_watcher::{
    FileEvent, FileEventListener, FileOperation, MonitoringRequest, PollingEngine,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Listener that keeps every event it receives
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<FileEvent>>,
}

impl FileEventListener for Recorder {
    fn on_file_event(&self, event: &FileEvent) {
        self.events
            .lock()
            .expect("recorder poisoned")
            .push(event.clone());
    }
}

impl Recorder {
    fn take(&self) -> Vec<FileEvent> {
        std::mem::take(&mut *self.events.lock().expect("recorder poisoned"))
    }

    fn take_for(&self, path: &Path) -> Vec<FileEvent> {
        self.take()
            .into_iter()
            .filter(|event| event.path == path)
            .collect()
    }
}

fn setup() -> (TempDir, PollingEngine, Arc<Recorder>) {
    let temp_dir = TempDir::new().expect("test setup failed");
    let engine = PollingEngine::default();
    let recorder = Arc::new(Recorder::default());
    engine.add_listener(recorder.clone());
    (temp_dir, engine, recorder)
}

fn write_at(path: &Path, secs: i64) -> SystemTime {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("test setup failed");
    }
    fs::write(path, format!("{secs}")).expect("test setup failed");
    set_file_mtime(path, FileTime::from_unix_time(secs, 0)).expect("test setup failed");
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
}

fn operations(events: &[FileEvent]) -> Vec<FileOperation> {
    events.iter().map(|event| event.operation).collect()
}

#[test]
fn test_rescan_without_changes_is_silent() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    write_at(&root.join("a.txt"), 1_000);
    write_at(&root.join("src/lib.rs"), 1_000);

    engine.add(MonitoringRequest::recursive(root));
    assert!(engine.scan_all() > 0);
    recorder.take();

    assert_eq!(engine.scan_all(), 0);
    assert_eq!(engine.scan_all(), 0);
    assert!(recorder.take().is_empty());
}

#[test]
fn test_first_scan_reports_monitoring_start() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    let file = root.join("existing.txt");
    let modified = write_at(&file, 1_500);

    assert!(engine.add(MonitoringRequest::flat(root)));
    engine.scan_all();

    assert_eq!(
        recorder.take(),
        vec![FileEvent::new(FileOperation::MonitoringStart, file, modified)]
    );
}

#[test]
fn test_create_then_delete_symmetry() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();

    let file = root.join("report.csv");
    let modified = write_at(&file, 2_000);
    engine.scan_all();
    assert_eq!(
        recorder.take_for(&file),
        vec![FileEvent::new(FileOperation::Created, file.clone(), modified)]
    );

    fs::remove_file(&file).expect("test setup failed");
    engine.scan_all();
    assert_eq!(
        recorder.take_for(&file),
        vec![FileEvent::new(FileOperation::Deleted, file.clone(), modified)]
    );
}

#[test]
fn test_modification_reports_update() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    let file = root.join("config.toml");
    write_at(&file, 3_000);

    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();
    recorder.take();

    let modified = write_at(&file, 3_100);
    assert_eq!(engine.scan_all(), 1);
    assert_eq!(
        recorder.take(),
        vec![FileEvent::new(FileOperation::Updated, file, modified)]
    );
}

#[test]
fn test_ancestor_request_subsumes_descendant() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    let inner_file = root.join("a/b/inner.txt");
    write_at(&inner_file, 4_000);

    let inner = MonitoringRequest::recursive(root.join("a/b"));
    let outer = MonitoringRequest::recursive(root.join("a"));

    assert!(engine.add(inner.clone()));
    engine.scan_all();
    recorder.take();

    assert!(engine.add(outer.clone()));
    assert_eq!(engine.list(), vec![outer.clone()]);
    assert_eq!(
        operations(&recorder.take()),
        vec![FileOperation::MonitoringFinish]
    );

    assert!(!engine.add(inner));
    assert_eq!(engine.list(), vec![outer]);
}

#[test]
fn test_remove_reports_monitoring_finish() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    write_at(&root.join("one.txt"), 5_000);
    write_at(&root.join("two.txt"), 5_000);

    let request = MonitoringRequest::flat(root);
    engine.add(request.clone());
    engine.scan_all();
    recorder.take();

    assert!(engine.remove(&request));
    assert_eq!(
        operations(&recorder.take()),
        vec![FileOperation::MonitoringFinish, FileOperation::MonitoringFinish]
    );
    assert!(engine.get_monitored_paths().is_empty());
    assert!(!engine.remove(&request));
}

#[test]
fn test_notification_and_full_scan_reconcile() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();

    let file = root.join("race.txt");
    write_at(&file, 6_000);
    engine.notify_created(&file);

    engine.scan_all();
    assert_eq!(engine.scan_notified(), 0);
    assert_eq!(
        operations(&recorder.take_for(&file)),
        vec![FileOperation::Created]
    );
}

#[test]
fn test_notified_scan_runs_before_full_scan() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();

    let file = root.join("fast.txt");
    write_at(&file, 7_000);
    engine.notify_created(&file);

    assert_eq!(engine.scan_notified(), 1);
    assert_eq!(engine.scan_all(), 0);
    assert_eq!(
        operations(&recorder.take_for(&file)),
        vec![FileOperation::Created]
    );
}

#[test]
fn test_consumer_ledgers_are_independent() {
    let (temp_dir, engine, _recorder) = setup();
    let root = temp_dir.path();
    let first = root.join("first.txt");
    write_at(&first, 8_000);

    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();

    let expected: BTreeSet<PathBuf> = [first.clone()].into_iter().collect();
    assert_eq!(engine.get_dirty_paths("indexer"), expected);

    let second = root.join("second.txt");
    write_at(&second, 8_100);
    engine.scan_all();

    let delta: BTreeSet<PathBuf> = [second.clone()].into_iter().collect();
    assert_eq!(engine.get_dirty_paths("indexer"), delta);
    assert!(engine.get_dirty_paths("indexer").is_empty());

    let universe: BTreeSet<PathBuf> = [first, second.clone()].into_iter().collect();
    assert_eq!(engine.get_dirty_paths("linter"), universe);

    write_at(&second, 8_200);
    engine.scan_all();
    assert_eq!(engine.get_dirty_paths("linter"), delta);
    assert_eq!(engine.get_dirty_paths("indexer"), delta);
}

#[test]
fn test_excluded_paths_are_never_reported() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    engine.add(MonitoringRequest::recursive(root));
    engine.scan_all();

    let hidden = root.join(".hidden");
    let build_output = root.join("target/debug/app");
    let source = root.join("src/target/kept.rs");
    write_at(&hidden, 9_000);
    write_at(&build_output, 9_000);
    write_at(&source, 9_000);
    engine.notify_created(&hidden);
    engine.notify_created(&build_output);
    engine.scan_all();

    let events = recorder.take();
    assert!(events
        .iter()
        .all(|event| event.path != hidden && !event.path.starts_with(root.join("target"))));
    assert!(events.iter().any(|event| event.path == source));

    write_at(&hidden, 9_100);
    fs::remove_file(&build_output).expect("test setup failed");
    engine.scan_all();
    assert!(recorder
        .take()
        .iter()
        .all(|event| event.path != hidden && !event.path.starts_with(root.join("target"))));

    let found = engine
        .find_matching(&format!("{}/**/*", root.display()))
        .expect("pattern should compile");
    assert!(!found.contains_key(&hidden));
    assert!(found.keys().all(|path| !path.starts_with(root.join("target"))));
    assert!(found.contains_key(&source));
}

#[test]
fn test_find_matching_across_directories() {
    let (temp_dir, engine, _recorder) = setup();
    let root = temp_dir.path();
    let foo = root.join("src/Foo.java");
    let bar = root.join("src/sub/Bar.java");
    write_at(&foo, 10_000);
    write_at(&bar, 10_000);
    write_at(&root.join("src/notes.txt"), 10_000);

    let java = engine
        .find_matching(&format!("{}/**/*.java", root.display()))
        .expect("pattern should compile");
    assert_eq!(java.keys().cloned().collect::<Vec<_>>(), vec![foo, bar]);

    let xml = engine
        .find_matching(&format!("{}/**/*.xml", root.display()))
        .expect("pattern should compile");
    assert!(xml.is_empty());
}

#[test]
fn test_matches_without_filesystem() {
    let engine = PollingEngine::default();
    assert!(engine
        .matches("/proj/*.txt", "/proj/readme.txt")
        .expect("pattern should compile"));
    assert!(!engine
        .matches("/proj/*.txt", "/proj/sub/readme.txt")
        .expect("pattern should compile"));

    let err = engine
        .matches("relative/path.txt", "/proj/readme.txt")
        .expect_err("pattern without a wildcard is invalid");
    assert!(err.is_invalid_pattern());
}

#[test]
fn test_flat_request_ignores_nested_changes() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    fs::create_dir(root.join("nested")).expect("test setup failed");

    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();
    recorder.take();

    let nested = root.join("nested/deep.txt");
    write_at(&nested, 11_000);
    engine.notify_created(&nested);
    assert!(!engine.is_dirty());

    engine.scan_all();
    assert!(recorder.take_for(&nested).is_empty());
}

#[test]
fn test_missing_root_reports_later_creation() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path().join("later");

    engine.add(MonitoringRequest::recursive(&root));
    assert_eq!(engine.scan_all(), 0);

    let file = root.join("born.txt");
    let modified = write_at(&file, 12_000);
    engine.scan_all();

    assert!(recorder
        .take()
        .contains(&FileEvent::new(FileOperation::Created, file, modified)));
}

#[test]
fn test_notified_directory_under_flat_request_is_not_recorded() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();

    let sub = root.join("sub");
    fs::create_dir(&sub).expect("test setup failed");
    engine.notify_created(&sub);

    assert_eq!(engine.scan_notified(), 0);
    assert!(!engine.get_monitored_paths().contains_key(&sub));
    assert_eq!(engine.scan_all(), 0);
    assert!(recorder.take_for(&sub).is_empty());
}

#[test]
fn test_notified_root_directory_is_not_recorded() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    write_at(&root.join("kept.txt"), 13_000);
    engine.add(MonitoringRequest::recursive(root));
    engine.scan_all();
    recorder.take();

    engine.notify_changed(root);
    assert_eq!(engine.scan_notified(), 0);
    assert!(!engine.get_monitored_paths().contains_key(root));
    assert_eq!(engine.scan_all(), 0);
    assert!(recorder.take().is_empty());
}

#[test]
fn test_single_file_request_reports_notified_change() {
    let (temp_dir, engine, recorder) = setup();
    let file = temp_dir.path().join("settings.json");
    write_at(&file, 14_000);
    engine.add(MonitoringRequest::flat(&file));
    engine.scan_all();
    recorder.take();

    let modified = write_at(&file, 14_100);
    engine.notify_changed(&file);
    assert_eq!(engine.scan_notified(), 1);
    assert_eq!(
        recorder.take(),
        vec![FileEvent::new(FileOperation::Updated, file, modified)]
    );
    assert_eq!(engine.scan_all(), 0);
}

#[test]
fn test_unconfirmed_notification_survives_full_scan() {
    let (temp_dir, engine, recorder) = setup();
    let root = temp_dir.path();
    let file = root.join("steady.txt");
    let modified = write_at(&file, 15_000);
    engine.add(MonitoringRequest::flat(root));
    engine.scan_all();
    recorder.take();

    engine.notify_changed(&file);
    assert_eq!(engine.scan_all(), 0);
    assert!(engine.is_dirty());

    assert_eq!(engine.scan_notified(), 1);
    assert!(!engine.is_dirty());
    assert_eq!(
        recorder.take(),
        vec![FileEvent::new(FileOperation::Updated, file, modified)]
    );
}
