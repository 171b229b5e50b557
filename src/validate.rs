use crate::config::UploadConfig;
use crate::store::FileHandle;

/// Caller-supplied per-file check. A returned message rejects the file with
/// exactly that message.
pub type ValidateFn = dyn Fn(&FileHandle) -> Option<String> + Send + Sync;

/// One screened-out candidate and the reason reported for it.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub file: FileHandle,
    pub reason: String,
}

/// Result of screening one candidate batch: the accepted subset in original
/// order, and every rejection with its first applicable reason.
#[derive(Debug, Default)]
pub struct Screened {
    pub accepted: Vec<FileHandle>,
    pub rejected: Vec<Rejection>,
}

/// Screen a candidate batch against the configured constraints.
///
/// The count check runs first and truncates the batch: with `max_files`
/// configured, candidates beyond the remaining quota are rejected before
/// any per-file check. Remaining candidates then pass through the custom
/// check, the accept list, and the size cap, stopping at the first failure
/// so each file is reported once.
pub fn screen(
    candidates: Vec<FileHandle>,
    current_count: usize,
    config: &UploadConfig,
    validate: Option<&ValidateFn>,
) -> Screened {
    let mut pending = candidates;
    let mut rejected = Vec::new();

    if let Some(max_files) = config.max_files {
        let remaining = max_files.saturating_sub(current_count);
        if remaining < pending.len() {
            for file in pending.split_off(remaining) {
                // A custom validation message takes precedence over the
                // quota message.
                let reason = validate
                    .and_then(|check| check(&file))
                    .unwrap_or_else(|| format!("Maximum {max_files} files allowed"));
                rejected.push(Rejection { file, reason });
            }
        }
    }

    let accept = config.accept_list();
    let mut accepted = Vec::new();

    for file in pending {
        if let Some(reason) = validate.and_then(|check| check(&file)) {
            rejected.push(Rejection { file, reason });
            continue;
        }

        if !accept.is_empty() && !matches_accept(&file, &accept) {
            rejected.push(Rejection {
                file,
                reason: "File type not accepted".to_string(),
            });
            continue;
        }

        if let Some(max_size) = config.max_size {
            if file.byte_size() > max_size {
                rejected.push(Rejection {
                    file,
                    reason: "File too large".to_string(),
                });
                continue;
            }
        }

        accepted.push(file);
    }

    Screened { accepted, rejected }
}

/// A file matches the accept list if its MIME type equals an entry, its
/// `.ext` equals an entry, or a wildcard entry's primary type prefixes its
/// MIME type. Matching is case-sensitive.
fn matches_accept(file: &FileHandle, accept: &[&str]) -> bool {
    let mime_type = file.mime_type();
    let extension = file.extension().map(|ext| format!(".{ext}"));

    accept.iter().any(|pattern| {
        if *pattern == mime_type {
            return true;
        }
        if let Some(extension) = &extension {
            if pattern == extension {
                return true;
            }
        }
        match pattern.strip_suffix("/*") {
            Some(primary) => mime_type.starts_with(&format!("{primary}/")),
            None => false,
        }
    })
}
