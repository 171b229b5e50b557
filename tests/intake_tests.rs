use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use file_intake::config::{ConfigError, UploadConfig};
use file_intake::intake::{FileSource, FileUpload, FileUploadOptions, PasteItem, UploadHooks};
use file_intake::preview::{PreviewAllocator, PreviewError};
use file_intake::store::{FileHandle, UploadStatus};

fn png_file(name: &str) -> FileHandle {
    FileHandle::new(name, "image/png", vec![0u8; 256])
}

fn pdf_file(name: &str) -> FileHandle {
    FileHandle::new(name, "application/pdf", vec![0u8; 1024])
}

fn pipeline(config: UploadConfig) -> FileUpload {
    FileUpload::new(FileUploadOptions {
        config,
        ..FileUploadOptions::default()
    })
}

/// Allocator that counts allocations and revocations.
#[derive(Default)]
struct CountingAllocator {
    allocated: AtomicUsize,
    revoked: AtomicUsize,
}

impl PreviewAllocator for CountingAllocator {
    fn allocate(&self, file: &FileHandle) -> Result<String, PreviewError> {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        Ok(format!("preview://{}", file.id()))
    }

    fn revoke(&self, _url: &str) {
        self.revoked.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Screening tests
// ============================================================================

#[tokio::test]
async fn test_picker_accepts_valid_files() {
    let upload = pipeline(UploadConfig::default());
    let a = png_file("a.png");
    let b = pdf_file("b.pdf");

    let intake = upload.submit(FileSource::Picker(vec![a.clone(), b.clone()]));

    assert_eq!(intake.accepted, vec![a.clone(), b.clone()]);
    assert!(intake.rejected.is_empty());

    let state = upload.store().get_state();
    assert_eq!(state.files.len(), 2);
    assert!(!state.invalid);
}

#[tokio::test]
async fn test_quota_admits_remaining_in_order() {
    let upload = pipeline(UploadConfig {
        max_files: Some(2),
        ..UploadConfig::default()
    });
    let a = png_file("a.png");
    let b = png_file("b.png");
    let c = png_file("c.png");

    let intake = upload.submit(FileSource::Picker(vec![a.clone(), b.clone(), c.clone()]));

    assert_eq!(intake.accepted, vec![a, b]);
    assert_eq!(intake.rejected.len(), 1);
    assert_eq!(intake.rejected[0].file, c);
    assert_eq!(intake.rejected[0].reason, "Maximum 2 files allowed");
    assert!(upload.store().get_state().invalid);
}

#[tokio::test]
async fn test_quota_counts_already_tracked_files() {
    let upload = pipeline(UploadConfig {
        max_files: Some(2),
        ..UploadConfig::default()
    });
    upload.submit(FileSource::Picker(vec![png_file("a.png")]));

    let intake = upload.submit(FileSource::Picker(vec![png_file("b.png"), png_file("c.png")]));

    assert_eq!(intake.accepted.len(), 1);
    assert_eq!(intake.rejected.len(), 1);
    assert_eq!(upload.store().get_state().files.len(), 2);
}

#[tokio::test]
async fn test_resubmitted_file_still_counts_against_quota() {
    let upload = pipeline(UploadConfig {
        max_files: Some(2),
        ..UploadConfig::default()
    });
    let a = png_file("a.png");
    upload.submit(FileSource::Picker(vec![a.clone()]));

    // The duplicate occupies the one remaining slot, so b overflows.
    let intake = upload.submit(FileSource::Picker(vec![a.clone(), png_file("b.png")]));

    assert_eq!(intake.accepted, vec![a]);
    assert_eq!(intake.rejected.len(), 1);
    assert_eq!(intake.rejected[0].reason, "Maximum 2 files allowed");
    assert_eq!(upload.store().get_state().files.len(), 1);
}

#[tokio::test]
async fn test_accept_list_rejects_wrong_type() {
    let upload = pipeline(UploadConfig {
        accept: Some("image/*".to_string()),
        ..UploadConfig::default()
    });
    let doc = pdf_file("doc.pdf");

    let intake = upload.submit(FileSource::Picker(vec![png_file("a.png"), doc.clone()]));

    assert_eq!(intake.accepted.len(), 1);
    assert_eq!(intake.rejected.len(), 1);
    assert_eq!(intake.rejected[0].file, doc);
    assert_eq!(intake.rejected[0].reason, "File type not accepted");
    // Rejected files never reach the store
    assert_eq!(upload.store().get_state().files.len(), 1);
}

#[tokio::test]
async fn test_accept_matches_exact_mime_and_extension() {
    let by_mime = pipeline(UploadConfig {
        accept: Some("application/pdf".to_string()),
        ..UploadConfig::default()
    });
    let intake = by_mime.submit(FileSource::Picker(vec![pdf_file("a.pdf")]));
    assert_eq!(intake.accepted.len(), 1);

    let by_extension = pipeline(UploadConfig {
        accept: Some(".pdf".to_string()),
        ..UploadConfig::default()
    });
    let intake = by_extension.submit(FileSource::Picker(vec![pdf_file("b.pdf")]));
    assert_eq!(intake.accepted.len(), 1);

    let mismatched = pipeline(UploadConfig {
        accept: Some("image/png, .txt".to_string()),
        ..UploadConfig::default()
    });
    let intake = mismatched.submit(FileSource::Picker(vec![pdf_file("c.pdf")]));
    assert!(intake.accepted.is_empty());
    assert_eq!(intake.rejected[0].reason, "File type not accepted");
}

#[tokio::test]
async fn test_max_size_rejects_oversized_files() {
    let upload = pipeline(UploadConfig {
        max_size: Some(512),
        ..UploadConfig::default()
    });
    let big = pdf_file("big.pdf");

    let intake = upload.submit(FileSource::Picker(vec![png_file("small.png"), big.clone()]));

    assert_eq!(intake.accepted.len(), 1);
    assert_eq!(intake.rejected.len(), 1);
    assert_eq!(intake.rejected[0].file, big);
    assert_eq!(intake.rejected[0].reason, "File too large");
}

#[tokio::test]
async fn test_custom_validation_runs_first() {
    let upload = FileUpload::new(FileUploadOptions {
        config: UploadConfig {
            // Would also fail the accept check; the custom message must win.
            accept: Some("image/*".to_string()),
            ..UploadConfig::default()
        },
        hooks: UploadHooks {
            on_file_validate: Some(Box::new(|file| {
                (file.name() == "bad.pdf").then(|| "Corrupt file".to_string())
            })),
            ..UploadHooks::default()
        },
        ..FileUploadOptions::default()
    });

    let intake = upload.submit(FileSource::Picker(vec![pdf_file("bad.pdf")]));

    assert_eq!(intake.rejected.len(), 1);
    assert_eq!(intake.rejected[0].reason, "Corrupt file");
}

#[tokio::test]
async fn test_custom_message_overrides_quota_message() {
    let upload = FileUpload::new(FileUploadOptions {
        config: UploadConfig {
            max_files: Some(1),
            ..UploadConfig::default()
        },
        hooks: UploadHooks {
            on_file_validate: Some(Box::new(|file| {
                (file.name() == "b.png").then(|| "Corrupt file".to_string())
            })),
            ..UploadHooks::default()
        },
        ..FileUploadOptions::default()
    });

    let intake = upload.submit(FileSource::Picker(vec![png_file("a.png"), png_file("b.png")]));

    assert_eq!(intake.accepted.len(), 1);
    assert_eq!(intake.rejected[0].reason, "Corrupt file");
}

#[tokio::test]
async fn test_first_rejection_wins() {
    // Fails both the accept check and the size check; only the first
    // (type) reason is reported, and the reject hook fires once.
    let rejections: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&rejections);
    let upload = FileUpload::new(FileUploadOptions {
        config: UploadConfig {
            accept: Some("image/*".to_string()),
            max_size: Some(16),
            ..UploadConfig::default()
        },
        hooks: UploadHooks {
            on_file_reject: Some(Box::new(move |file, reason| {
                recorded
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", file.name(), reason));
            })),
            ..UploadHooks::default()
        },
        ..FileUploadOptions::default()
    });

    let intake = upload.submit(FileSource::Picker(vec![pdf_file("huge.pdf")]));

    assert_eq!(intake.rejected.len(), 1);
    assert_eq!(intake.rejected[0].reason, "File type not accepted");
    assert_eq!(
        *rejections.lock().unwrap(),
        vec!["huge.pdf:File type not accepted".to_string()]
    );
}

#[tokio::test]
async fn test_disabled_ignores_input() {
    let upload = pipeline(UploadConfig {
        disabled: true,
        ..UploadConfig::default()
    });

    let intake = upload.submit(FileSource::Picker(vec![png_file("a.png")]));

    assert!(intake.accepted.is_empty());
    assert!(intake.rejected.is_empty());
    assert!(upload.store().get_state().files.is_empty());
}

#[tokio::test]
async fn test_duplicate_candidates_collapse_within_event() {
    let upload = pipeline(UploadConfig {
        max_files: Some(2),
        ..UploadConfig::default()
    });
    let a = png_file("a.png");

    let intake = upload.submit(FileSource::Picker(vec![a.clone(), a.clone(), a.clone()]));

    // One candidate after dedupe, so the quota is untouched
    assert_eq!(intake.accepted.len(), 1);
    assert!(intake.rejected.is_empty());
    assert_eq!(upload.store().get_state().files.len(), 1);
}

#[tokio::test]
async fn test_empty_batch_is_noop() {
    let upload = pipeline(UploadConfig::default());

    let intake = upload.submit(FileSource::Picker(Vec::new()));

    assert!(intake.accepted.is_empty());
    assert!(intake.rejected.is_empty());
    assert!(intake.upload.is_none());
    assert!(upload.store().get_state().files.is_empty());
}

// ============================================================================
// Event source tests
// ============================================================================

#[tokio::test]
async fn test_drag_drop_clears_drag_over() {
    let upload = pipeline(UploadConfig::default());
    upload.set_drag_over(true);

    let intake = upload.submit(FileSource::DragDrop(vec![png_file("a.png")]));

    assert_eq!(intake.accepted.len(), 1);
    assert!(!upload.store().get_state().drag_over);
}

#[tokio::test]
async fn test_drag_drop_clears_drag_over_even_when_disabled() {
    let upload = pipeline(UploadConfig {
        disabled: true,
        ..UploadConfig::default()
    });
    upload.set_drag_over(true);

    let intake = upload.submit(FileSource::DragDrop(vec![png_file("a.png")]));

    assert!(intake.accepted.is_empty());
    assert!(!upload.store().get_state().drag_over);
}

#[tokio::test]
async fn test_paste_extracts_files_and_ignores_text() {
    let upload = pipeline(UploadConfig::default());
    let a = png_file("pasted.png");

    let intake = upload.submit(FileSource::Paste(vec![
        PasteItem::Text("hello".to_string()),
        PasteItem::File(a.clone()),
        PasteItem::Text("world".to_string()),
    ]));

    assert_eq!(intake.accepted, vec![a]);
    assert_eq!(upload.store().get_state().files.len(), 1);
}

#[tokio::test]
async fn test_text_only_paste_is_noop() {
    let upload = pipeline(UploadConfig::default());

    let intake = upload.submit(FileSource::Paste(vec![PasteItem::Text("hello".to_string())]));

    assert!(intake.accepted.is_empty());
    assert!(intake.rejected.is_empty());
    assert!(upload.store().get_state().files.is_empty());
}

#[tokio::test]
async fn test_controlled_bypasses_screening() {
    let upload = pipeline(UploadConfig {
        accept: Some("image/*".to_string()),
        max_files: Some(1),
        ..UploadConfig::default()
    });
    let a = pdf_file("a.pdf");
    let b = png_file("b.png");

    let intake = upload.submit(FileSource::Controlled(vec![a.clone(), b.clone()]));

    // Controlled membership is the caller's authority: no screening,
    // no rejections, no upload kickoff.
    assert!(intake.accepted.is_empty());
    assert!(intake.rejected.is_empty());
    assert!(intake.upload.is_none());

    let state = upload.store().get_state();
    assert_eq!(state.files.len(), 2);
    assert_eq!(state.files[0].status, UploadStatus::Idle);
    assert!(!state.invalid);
}

#[tokio::test]
async fn test_controlled_empty_clears_membership() {
    let upload = pipeline(UploadConfig::default());
    upload.submit(FileSource::Controlled(vec![png_file("a.png")]));

    upload.submit(FileSource::Controlled(Vec::new()));

    assert!(upload.store().get_state().files.is_empty());
}

#[tokio::test]
async fn test_initial_files_are_seeded_without_screening() {
    let upload = FileUpload::new(FileUploadOptions {
        config: UploadConfig {
            accept: Some("image/*".to_string()),
            ..UploadConfig::default()
        },
        initial_files: vec![pdf_file("seeded.pdf")],
        ..FileUploadOptions::default()
    });

    let state = upload.store().get_state();
    assert_eq!(state.files.len(), 1);
    assert_eq!(state.files[0].status, UploadStatus::Idle);
}

// ============================================================================
// Invalid window tests
// ============================================================================

#[tokio::test]
async fn test_invalid_flag_clears_after_window() {
    let upload = pipeline(UploadConfig {
        max_files: Some(1),
        ..UploadConfig::default()
    });

    upload.submit(FileSource::Picker(vec![png_file("a.png"), png_file("b.png")]));
    assert!(upload.store().get_state().invalid);

    tokio::time::sleep(Duration::from_millis(2300)).await;
    assert!(!upload.store().get_state().invalid);
}

#[tokio::test]
async fn test_overlapping_rejections_extend_invalid_window() {
    let upload = pipeline(UploadConfig {
        accept: Some("image/*".to_string()),
        ..UploadConfig::default()
    });

    upload.submit(FileSource::Picker(vec![pdf_file("a.pdf")]));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    upload.submit(FileSource::Picker(vec![pdf_file("b.pdf")]));

    // The first window has lapsed but the second is still open
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(upload.store().get_state().invalid);

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert!(!upload.store().get_state().invalid);
}

// ============================================================================
// Hook ordering tests
// ============================================================================

#[tokio::test]
async fn test_hooks_fire_in_order() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = |tag: &'static str| {
        let events = Arc::clone(&events);
        move |detail: String| events.lock().unwrap().push(format!("{tag}:{detail}"))
    };

    let on_reject = log("reject");
    let on_value = log("value");
    let on_accept = log("accept");
    let on_file = log("file_accept");
    let upload = FileUpload::new(FileUploadOptions {
        config: UploadConfig {
            max_files: Some(1),
            ..UploadConfig::default()
        },
        hooks: UploadHooks {
            on_value_change: Some(Box::new(move |files| on_value(files.len().to_string()))),
            on_accept: Some(Box::new(move |files| on_accept(files.len().to_string()))),
            on_file_accept: Some(Box::new(move |file| on_file(file.name().to_string()))),
            on_file_reject: Some(Box::new(move |file, _reason| {
                on_reject(file.name().to_string())
            })),
            ..UploadHooks::default()
        },
        ..FileUploadOptions::default()
    });

    upload.submit(FileSource::Picker(vec![png_file("a.png"), png_file("b.png")]));

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "reject:b.png".to_string(),
            "value:1".to_string(),
            "accept:1".to_string(),
            "file_accept:a.png".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_value_change_fires_on_remove_and_clear() {
    let calls: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let upload = FileUpload::new(FileUploadOptions {
        hooks: UploadHooks {
            on_value_change: Some(Box::new(move |files| {
                recorded.lock().unwrap().push(files.len());
            })),
            ..UploadHooks::default()
        },
        ..FileUploadOptions::default()
    });

    let a = png_file("a.png");
    let b = png_file("b.png");
    upload.submit(FileSource::Picker(vec![a.clone(), b.clone()]));
    upload.remove_file(a.id());
    upload.clear();

    assert_eq!(*calls.lock().unwrap(), vec![2, 1, 0]);
}

// ============================================================================
// View and preview tests
// ============================================================================

#[tokio::test]
async fn test_file_view_projection() {
    let upload = pipeline(UploadConfig::default());
    let a = png_file("photo.png");
    upload.submit(FileSource::Picker(vec![a.clone()]));

    let view = upload.file_view(a.id()).expect("view should exist");
    assert_eq!(view.id, a.id().to_string());
    assert_eq!(view.name, "photo.png");
    assert_eq!(view.byte_size, 256);
    assert_eq!(view.size, "256 B");
    // No transport configured, so accepted files complete immediately
    assert_eq!(view.status, UploadStatus::Success);
    assert_eq!(view.progress, 100);
    assert_eq!(view.status_line, "Upload complete");
    assert_eq!(view.error, None);
    let preview = view.preview_url.expect("image should have a preview");
    assert!(preview.starts_with("data:image/png;base64,"));

    assert!(upload.file_view(png_file("ghost.png").id()).is_none());
}

#[tokio::test]
async fn test_views_follow_store_order() {
    let upload = pipeline(UploadConfig::default());
    upload.submit(FileSource::Picker(vec![png_file("a.png"), pdf_file("b.pdf")]));

    let views = upload.views();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].name, "a.png");
    assert_eq!(views[1].name, "b.pdf");
    assert!(views[1].preview_url.is_none());
}

#[tokio::test]
async fn test_drop_releases_outstanding_previews() {
    let allocator = Arc::new(CountingAllocator::default());
    let upload = FileUpload::new(FileUploadOptions {
        previews: Some(allocator.clone()),
        ..FileUploadOptions::default()
    });
    let a = png_file("a.png");
    upload.submit(FileSource::Picker(vec![a.clone()]));

    upload.file_view(a.id()).expect("view should exist");
    assert_eq!(allocator.allocated.load(Ordering::SeqCst), 1);

    drop(upload);
    assert_eq!(allocator.revoked.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Config tests
// ============================================================================

#[test]
fn test_config_rejects_zero_limits() {
    let config = UploadConfig {
        max_files: Some(0),
        ..UploadConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
    assert_eq!(
        err.to_string(),
        "Invalid configuration: MAX_FILES must be at least 1"
    );

    let config = UploadConfig {
        max_size: Some(0),
        ..UploadConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_accept_list_parses() {
    let config = UploadConfig {
        accept: Some("image/*, .pdf ,application/zip".to_string()),
        ..UploadConfig::default()
    };
    assert_eq!(config.accept_list(), vec!["image/*", ".pdf", "application/zip"]);

    assert!(UploadConfig::default().accept_list().is_empty());
}

// No other test in this binary touches these variables.
#[test]
fn test_config_from_env() {
    std::env::set_var("ACCEPT", "image/*");
    std::env::set_var("MAX_FILES", "5");
    std::env::set_var("MULTIPLE", "true");
    std::env::remove_var("MAX_SIZE");
    std::env::remove_var("DISABLED");

    let config = UploadConfig::from_env().unwrap();
    assert_eq!(config.accept, Some("image/*".to_string()));
    assert_eq!(config.max_files, Some(5));
    // Unset size cap falls back to the 50MB default
    assert_eq!(config.max_size, Some(50 * 1024 * 1024));
    assert!(config.multiple);
    assert!(!config.disabled);

    std::env::remove_var("ACCEPT");
    std::env::remove_var("MAX_FILES");
    std::env::remove_var("MULTIPLE");
}
