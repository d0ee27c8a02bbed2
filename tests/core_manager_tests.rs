use std::fs;
use std::path::Path;
use std::sync::mpsc;

use file_generation_tool::config::Config;
use file_generation_tool::core::manager::{GenerationStatus, SessionController, SessionEvent};
use file_generation_tool::{GenerationRequest, Outcome, StartError, ValidationError};

const CHUNK: usize = 100 * 1024;

fn test_controller() -> SessionController {
    SessionController::new(Config {
        chunk_size: CHUNK,
        ..Config::default()
    })
}

fn drain(events: &mpsc::Receiver<SessionEvent>) -> (Vec<f64>, Outcome) {
    let mut percents = Vec::new();
    for event in events.iter() {
        match event {
            SessionEvent::Progress(snapshot) => percents.push(snapshot.percent),
            SessionEvent::Finished(outcome) => {
                assert!(events.try_recv().is_err(), "event after terminal outcome");
                return (percents, outcome);
            }
        }
    }
    panic!("channel closed without a terminal outcome");
}

#[test]
fn test_full_generation_flow() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let handle = controller
        .start_from_input(dir.path().to_str().unwrap(), "1", "MB")
        .unwrap();
    let path = handle.path().to_path_buf();
    assert_eq!(path, dir.path().join("tool generated file.txt"));

    let (percents, outcome) = drain(handle.events());
    assert_eq!(percents.len(), 11);
    assert!(percents.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(*percents.last().unwrap(), 100.0);
    assert_eq!(
        outcome,
        Outcome::Completed {
            path: path.clone(),
            bytes_written: 1024 * 1024,
        }
    );

    assert_eq!(handle.wait(), outcome);
    assert!(!controller.is_active(&path));

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 1024 * 1024);
    assert!(bytes.iter().all(|b| *b == b'A'));
}

#[test]
fn test_cancel_after_third_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let request = GenerationRequest::new(dir.path().join("big.txt"), 1024 * 1024).unwrap();

    let (reached_tx, reached_rx) = mpsc::channel();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let mut seen = 0;
    let handle = controller
        .start_with_observer(request, move |_| {
            seen += 1;
            if seen == 3 {
                let _ = reached_tx.send(());
                let _ = gate_rx.recv();
            }
        })
        .unwrap();

    reached_rx.recv().unwrap();
    handle.cancel();
    handle.cancel();
    gate_tx.send(()).unwrap();

    let (percents, outcome) = drain(handle.events());
    assert_eq!(percents.len(), 3);
    assert_eq!(
        outcome,
        Outcome::Cancelled {
            path: dir.path().join("big.txt"),
            bytes_written: 3 * CHUNK as u64,
            partial_file_deleted: true,
        }
    );
    assert!(!dir.path().join("big.txt").exists());
    assert_eq!(handle.status(), GenerationStatus::Cancelled);
    assert!(handle.wait().is_cancelled());
}

#[test]
fn test_undeletable_partial_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let path = dir.path().join("stuck.txt");
    let request = GenerationRequest::new(&path, 1024 * 1024).unwrap();

    let (reached_tx, reached_rx) = mpsc::channel();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let swap = path.clone();
    let mut first = true;
    let handle = controller
        .start_with_observer(request, move |_| {
            if first {
                first = false;
                fs::remove_file(&swap).unwrap();
                fs::create_dir(&swap).unwrap();
                fs::write(swap.join("keep"), b"x").unwrap();
                let _ = reached_tx.send(());
                let _ = gate_rx.recv();
            }
        })
        .unwrap();

    reached_rx.recv().unwrap();
    handle.cancel();
    gate_tx.send(()).unwrap();

    let (percents, outcome) = drain(handle.events());
    assert_eq!(percents.len(), 1);
    assert!(matches!(outcome, Outcome::CleanupFailed { .. }));
    assert!(matches!(handle.status(), GenerationStatus::CleanupFailed(_)));
    assert!(path.exists());
    assert_eq!(handle.wait(), outcome);
}

#[test]
fn test_cancel_after_completion_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let request = GenerationRequest::new(dir.path().join("done.txt"), 250_000).unwrap();
    let handle = controller.start(request).unwrap();

    let (_, outcome) = drain(handle.events());
    assert!(outcome.is_completed());

    handle.cancel();
    handle.cancel();
    assert_eq!(handle.status(), GenerationStatus::Completed);
    assert_eq!(handle.wait(), outcome);
    assert_eq!(fs::metadata(dir.path().join("done.txt")).unwrap().len(), 250_000);
}

#[test]
fn test_invalid_sizes_never_touch_disk() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let folder = dir.path().to_str().unwrap();

    for size in ["0", "-5", "abc", ""] {
        let err = controller.start_from_input(folder, size, "MB").err().unwrap();
        assert!(matches!(err, StartError::Invalid(_)), "size {size:?}");
    }
    assert!(matches!(
        controller.start_from_input("", "1", "GB"),
        Err(StartError::Invalid(ValidationError::MissingDestination))
    ));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_unwritable_destination_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let missing = dir.path().join("does/not/exist");
    let handle = controller
        .start_from_input(missing.to_str().unwrap(), "1", "MB")
        .unwrap();

    let (percents, outcome) = drain(handle.events());
    assert!(percents.is_empty());
    match &outcome {
        Outcome::Failed { bytes_written, error, .. } => {
            assert_eq!(*bytes_written, 0);
            assert!(!error.is_empty());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(handle.status(), GenerationStatus::Failed(_)));
    assert!(!Path::new(&missing).exists());
    assert_eq!(handle.wait(), outcome);
}

#[test]
fn test_second_run_on_same_destination_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let path = dir.path().join("busy.txt");

    let (reached_tx, reached_rx) = mpsc::channel();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let mut first = true;
    let handle = controller
        .start_with_observer(
            GenerationRequest::new(&path, 500_000).unwrap(),
            move |_| {
                if first {
                    first = false;
                    let _ = reached_tx.send(());
                    let _ = gate_rx.recv();
                }
            },
        )
        .unwrap();

    reached_rx.recv().unwrap();
    assert_eq!(handle.status(), GenerationStatus::Writing);
    assert!(controller.is_active(&path));
    let second = controller.start(GenerationRequest::new(&path, 10).unwrap());
    assert!(matches!(second, Err(StartError::Busy(p)) if p == path));

    gate_tx.send(()).unwrap();
    assert!(handle.wait().is_completed());
    assert!(!controller.is_active(&path));

    let again = controller
        .start(GenerationRequest::new(&path, 10).unwrap())
        .unwrap();
    assert!(again.wait().is_completed());
    assert_eq!(fs::metadata(&path).unwrap().len(), 10);
}

#[test]
fn test_progress_is_readable_from_handle() {
    let dir = tempfile::tempdir().unwrap();
    let controller = test_controller();
    let handle = controller
        .start(GenerationRequest::new(dir.path().join("p.txt"), 300_000).unwrap())
        .unwrap();

    let (_, outcome) = drain(handle.events());
    let latest = handle.progress().unwrap();
    assert_eq!(latest.bytes_written, outcome.bytes_written());
    assert_eq!(latest.percent, 100.0);
    assert_eq!(handle.id().len(), 16);
}
