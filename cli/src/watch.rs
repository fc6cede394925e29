//! Re-run processing whenever the input file changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, new_debouncer};
use tracing::{debug, info, warn};

/// Block, calling `on_change` once per debounced change to `path`.
///
/// Returns only if the watcher shuts down.
pub fn watch(path: &Path, debounce: Duration, mut on_change: impl FnMut()) -> Result<()> {
    let target = path
        .canonicalize()
        .with_context(|| format!("cannot watch '{}'", path.display()))?;
    let dir = target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (tx, rx) = mpsc::channel();
    let filter_target = target.clone();
    let mut debouncer = new_debouncer(
        debounce,
        move |res: Result<Vec<DebouncedEvent>, notify::Error>| match res {
            Ok(events) => {
                if events.iter().any(|e| is_target(&e.path, &filter_target)) {
                    // A closed receiver means the loop has ended.
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!(error = %e, "filesystem watch error"),
        },
    )
    .context("cannot create filesystem watcher")?;

    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("cannot watch '{}'", dir.display()))?;

    info!(
        path = %target.display(),
        debounce_ms = debounce.as_millis() as u64,
        "watching for changes"
    );

    for () in rx {
        debug!(path = %target.display(), "change detected");
        on_change();
    }
    Ok(())
}

fn is_target(event_path: &Path, target: &Path) -> bool {
    event_path == target || event_path.canonicalize().is_ok_and(|p| p == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_input_file_matches() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("deck.md");
        let output = dir.path().join("build.md");
        std::fs::write(&input, "").unwrap();
        std::fs::write(&output, "").unwrap();
        let target = input.canonicalize().unwrap();

        assert!(is_target(&target, &target));
        assert!(is_target(&input, &target));
        assert!(!is_target(&output, &target));
    }
}
