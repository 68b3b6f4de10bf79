use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::model::feed::{FeedEvent, RawEvent};

/// Which activity stream a tab shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum FeedKind {
    /// Events from people and repositories the user follows.
    Received,
    /// Events performed by the user.
    Performed,
    /// The public timeline.
    Public,
}

impl FeedKind {
    pub fn label(self) -> &'static str {
        match self {
            FeedKind::Received => "News Feed",
            FeedKind::Performed => "Activity",
            FeedKind::Public => "Public",
        }
    }

    /// Whether the feed is scoped to a user login.
    pub fn needs_user(self) -> bool {
        !matches!(self, FeedKind::Public)
    }

    /// REST path for `gh api`.
    pub fn endpoint(self, user: Option<&str>) -> Option<String> {
        match (self, user) {
            (FeedKind::Received, Some(user)) => Some(format!("users/{}/received_events", user)),
            (FeedKind::Performed, Some(user)) => Some(format!("users/{}/events", user)),
            (FeedKind::Public, _) => Some("events".to_string()),
            (_, None) => None,
        }
    }
}

/// Decode a JSON array of events. Entries that don't look like events are
/// skipped with a warning.
pub fn parse_events(bytes: &[u8]) -> Result<Vec<FeedEvent>> {
    let values: Vec<Value> = serde_json::from_slice(bytes).context("feed is not a JSON array")?;
    let mut events = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawEvent>(value) {
            Ok(raw) => events.push(FeedEvent::from(raw)),
            Err(e) => tracing::warn!(index = i, error = %e, "skipping malformed event"),
        }
    }
    Ok(events)
}

/// Load events from a JSON file.
pub fn load_feed_file(path: &Path) -> Result<Vec<FeedEvent>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let events = parse_events(&bytes)?;
    tracing::debug!(path = %path.display(), count = events.len(), "loaded feed file");
    Ok(events)
}

/// Fetch a feed with `gh api`.
pub fn fetch_feed(kind: FeedKind, user: Option<&str>, per_page: u32) -> Result<Vec<FeedEvent>> {
    let Some(endpoint) = kind.endpoint(user) else {
        anyhow::bail!("{} needs a user; set feed.user or log in with gh", kind.label());
    };
    let path = format!("{}?per_page={}", endpoint, per_page);
    let stdout = run_gh(&["api", &path])?;
    let events = parse_events(&stdout)?;
    tracing::info!(feed = ?kind, count = events.len(), "fetched feed");
    Ok(events)
}

/// Run a gh command, returning stdout on success.
fn run_gh(args: &[&str]) -> Result<Vec<u8>> {
    let mut child = std::process::Command::new("gh")
        .args(args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .context("failed to run gh")?;

    let output = wait_with_output(&mut child)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("gh failed: {}", stderr.trim());
    }
    Ok(output.stdout)
}

/// Wait for a child process while draining stdout and stderr on their own
/// threads, so a full pipe can't block the child.
fn wait_with_output(child: &mut std::process::Child) -> Result<std::process::Output> {
    use std::io::Read;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stdout_pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    });

    let status = child.wait()?;
    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(std::process::Output { status, stdout, stderr })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::feed::EventKind;

    #[test]
    fn endpoints() {
        assert_eq!(
            FeedKind::Received.endpoint(Some("octocat")).as_deref(),
            Some("users/octocat/received_events")
        );
        assert_eq!(
            FeedKind::Performed.endpoint(Some("octocat")).as_deref(),
            Some("users/octocat/events")
        );
        assert_eq!(FeedKind::Public.endpoint(None).as_deref(), Some("events"));
        assert_eq!(FeedKind::Received.endpoint(None), None);
    }

    #[test]
    fn parse_skips_malformed_entries() {
        let json = br#"[
            {"type": "ForkEvent", "actor": "octocat", "payload": {"repo": "octo/hello"}},
            {"no_type": true},
            {"type": "GistEvent", "actor": "hubot", "payload": {"action": "create", "name": "gist: 1"}}
        ]"#;
        let events = parse_events(json).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].kind, EventKind::Fork { .. }));
        assert_eq!(events[1].actor, "hubot");
    }

    #[test]
    fn partial_repository_keeps_the_rest_of_the_feed() {
        let json = br#"[
            {"type": "PublicEvent", "actor": "octocat", "repository": {"owner": "octo", "name": "hello"}},
            {"type": "GistEvent", "actor": "hubot", "payload": {"action": "create", "name": "gist: 1"}},
            {"type": "WatchEvent", "actor": "octocat", "repository": {"name": "hello"},
             "payload": {"action": "started", "repo": "octo/hello"}}
        ]"#;
        let events = parse_events(json).unwrap();
        assert_eq!(events.len(), 3);
        assert!(events[0].repository.is_some());
        assert!(events[2].repository.is_none());
        assert_eq!(events[2].payload_repo(), Some("octo/hello"));
    }

    #[test]
    fn parse_rejects_non_arrays() {
        assert!(parse_events(b"{}").is_err());
    }

    #[test]
    fn loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, r#"[{"type": "PublicEvent", "actor": "octocat"}]"#).unwrap();
        let events = load_feed_file(&path).unwrap();
        assert_eq!(events[0].kind, EventKind::Public { repo: None });
        assert!(load_feed_file(&dir.path().join("missing.json")).is_err());
    }
}
