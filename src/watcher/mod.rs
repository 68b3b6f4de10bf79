use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};

use crate::config::DEBOUNCE_MS;
use crate::event::AppEvent;

/// Watch the feed file and send `FeedFileChanged` when it is written.
/// The parent directory is watched so editors that replace the file are
/// still noticed.
pub fn start_watcher(
    feed_file: PathBuf,
    tx: mpsc::Sender<AppEvent>,
) -> Result<notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>> {
    let dir = feed_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let target = feed_file.clone();

    let mut debouncer = new_debouncer(
        Duration::from_millis(DEBOUNCE_MS),
        move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
            let events = match res {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(error = %e, "file watcher error");
                    return;
                }
            };

            if events
                .iter()
                .any(|e| e.kind == DebouncedEventKind::Any && is_feed_file(&e.path, &target))
            {
                let _ = tx.send(AppEvent::FeedFileChanged);
            }
        },
    )?;

    debouncer
        .watcher()
        .watch(&dir, notify::RecursiveMode::NonRecursive)
        .with_context(|| format!("cannot watch {}", dir.display()))?;
    tracing::debug!(path = %feed_file.display(), "watching feed file");

    Ok(debouncer)
}

fn is_feed_file(path: &Path, target: &Path) -> bool {
    if path == target {
        return true;
    }
    match (path.file_name(), target.file_name()) {
        (Some(a), Some(b)) if a == b => {
            let canon = |p: &Path| std::fs::canonicalize(p).ok();
            match (canon(path), canon(target)) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_feed_file() {
        let target = Path::new("/tmp/feeds/events.json");
        assert!(is_feed_file(Path::new("/tmp/feeds/events.json"), target));
        assert!(!is_feed_file(Path::new("/tmp/feeds/other.json"), target));
    }
}
