use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tempfile::TempDir;
use webp_batch::decoder::Decoder;
use webp_batch::job::{ConversionJob, Settings};
use webp_batch::worker::{Worker, WorkerEvent};

fn write_png(dir: &Path, name: &str, size: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(size, size, |x, y| Rgb([(x * 3) as u8, (y * 3) as u8, 90]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn test_spawned_worker_streams_events_in_order() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_png(dir.path(), "one.png", 40),
        dir.path().join("missing.png"),
        write_png(dir.path(), "three.png", 24),
    ];
    let job = ConversionJob::new(files.clone(), Settings::default()).unwrap();

    let handle = Worker::new(job).spawn();
    let events: Vec<WorkerEvent> = handle.events().iter().collect();
    let summary = handle.join();

    assert_eq!(events.len(), 7, "{events:#?}");
    match &events[0] {
        WorkerEvent::Converted(r) => assert_eq!(r.source, files[0]),
        other => panic!("expected a result first, got {other:?}"),
    }
    assert_eq!(events[1], WorkerEvent::Progress(33));
    match &events[2] {
        WorkerEvent::Failed(e) => {
            assert_eq!(e.source, files[1]);
            assert_eq!(e.message, "file not found");
        }
        other => panic!("expected a failure second, got {other:?}"),
    }
    assert_eq!(events[5], WorkerEvent::Progress(100));
    assert_eq!(events[6], WorkerEvent::Finished(summary));
    assert_eq!((summary.converted, summary.failed), (2, 1));

    let output = fs::read(dir.path().join("three.webp")).unwrap();
    let decoded = Decoder::new(&output).decode().expect("output decodes");
    assert_eq!((decoded.width(), decoded.height()), (24, 24));
}

#[test]
fn test_cancel_from_the_caller_thread_leaves_a_converted_prefix() {
    let dir = TempDir::new().unwrap();
    let files: Vec<_> = (0..5)
        .map(|i| write_png(dir.path(), &format!("img{i}.png"), 256))
        .collect();
    let job = ConversionJob::new(files, Settings::default()).unwrap();

    let handle = Worker::new(job).spawn();
    let mut results = 0;
    let mut finished = None;
    for event in handle.events().iter() {
        match event {
            WorkerEvent::Converted(_) => {
                results += 1;
                if results == 1 {
                    handle.cancel();
                }
            }
            WorkerEvent::Finished(summary) => finished = Some(summary),
            _ => {}
        }
    }
    let summary = handle.join();

    assert_eq!(finished, Some(summary));
    assert_eq!(results, summary.converted);
    assert_eq!(summary.converted + summary.skipped(), 5);
    // Files are handled in order, so exactly the first `converted` exist.
    for i in 0..5 {
        let exists = dir.path().join(format!("img{i}.webp")).exists();
        assert_eq!(exists, i < summary.converted, "img{i}.webp");
    }
}
