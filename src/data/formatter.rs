use std::fmt;

use crate::model::feed::{branch_of, repo_basename, EventKind, FeedEvent, Repository};
use crate::strings::{StringKey, Templates};

/// Commit lines shown for a push before the "+N more" summary.
pub const MAX_PUSH_LINES: usize = 3;
pub const SHORT_SHA_LEN: usize = 7;
pub const DEFAULT_TEASER_LEN: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLine {
    pub short_sha: String,
    pub message: String,
}

/// Second line of a feed row. `Hidden` means the row has no description
/// at all; an empty string is never stored as `Text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Hidden,
    Text(String),
    Commits {
        lines: Vec<CommitLine>,
        more: Option<String>,
    },
    CommitComment {
        prefix: String,
        short_sha: String,
        sha: String,
    },
}

impl Description {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Description::Hidden
        } else {
            Description::Text(s)
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Description::Hidden)
    }

    /// Plain-text lines of the description, as printed by `render`.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Description::Hidden => Vec::new(),
            Description::Text(text) => text.lines().map(String::from).collect(),
            Description::Commits { lines, more } => lines
                .iter()
                .map(|l| format!("{} {}", l.short_sha, l.message))
                .chain(more.iter().cloned())
                .collect(),
            Description::CommitComment {
                prefix, short_sha, ..
            } => vec![format!("{}{}", prefix, short_sha)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    pub title: String,
    pub description: Description,
}

/// Renders feed events into row text using a template bundle.
pub struct Formatter<'a> {
    templates: &'a Templates,
    teaser_len: usize,
}

impl<'a> Formatter<'a> {
    pub fn new(templates: &'a Templates) -> Self {
        Formatter {
            templates,
            teaser_len: DEFAULT_TEASER_LEN,
        }
    }

    pub fn with_teaser_len(mut self, teaser_len: usize) -> Self {
        self.teaser_len = teaser_len;
        self
    }

    pub fn render(&self, event: &FeedEvent) -> RenderResult {
        RenderResult {
            title: self.title(event),
            description: self.description(event),
        }
    }

    fn fmt(&self, key: StringKey, args: &[&dyn fmt::Display]) -> String {
        self.templates.format(key, args)
    }

    pub fn title(&self, event: &FeedEvent) -> String {
        let actor = event.actor.as_str();
        let repository = event.repository.as_ref();

        match &event.kind {
            EventKind::Push { git_ref, repo, .. } => {
                let (owner, name) = owner_and_name(repository, repo);
                let branch = branch_of(git_ref);
                self.fmt(StringKey::EventPushTitle, &[&actor, &branch, &owner, &name])
            }
            EventKind::Issues {
                action,
                number,
                repo,
                ..
            } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(
                    StringKey::EventIssuesTitle,
                    &[&actor, action, number, &owner, &name],
                )
            }
            EventKind::CommitComment { repo, .. } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(StringKey::EventCommitCommentTitle, &[&actor, &owner, &name])
            }
            EventKind::PullRequest {
                action,
                number,
                repo,
                ..
            } => {
                let (owner, name) = owner_and_name(repository, repo);
                let shown = pull_request_action(action);
                self.fmt(
                    StringKey::EventPullRequestTitle,
                    &[&actor, &shown, number, &owner, &name],
                )
            }
            EventKind::Watch { action, repo } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(StringKey::EventWatchTitle, &[&actor, action, &owner, &name])
            }
            EventKind::Gist { action, name, .. } => {
                self.fmt(StringKey::EventGistTitle, &[&actor, action, name])
            }
            EventKind::Fork { repo, .. } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(StringKey::EventForkTitle, &[&actor, &owner, &name])
            }
            EventKind::ForkApply { repo } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(StringKey::EventForkApplyTitle, &[&actor, &owner, &name])
            }
            EventKind::Follow { target, target_id } => {
                let followed = match (target, target_id) {
                    (Some(t), _) => t.login.clone(),
                    (None, Some(id)) => id.to_string(),
                    (None, None) => String::new(),
                };
                self.fmt(StringKey::EventFollowTitle, &[&actor, &followed])
            }
            EventKind::Create {
                object,
                name: created,
                object_name,
                repo,
            } => match object.as_str() {
                "repository" => self.fmt(StringKey::EventCreateRepoTitle, &[&actor, created]),
                "branch" | "tag" => {
                    let (owner, name) = owner_and_name(repository, repo);
                    self.fmt(
                        StringKey::EventCreateBranchTitle,
                        &[&actor, object, object_name, &owner, &name],
                    )
                }
                _ => actor.to_string(),
            },
            EventKind::Delete {
                object,
                name: deleted,
                ref_type,
                git_ref,
                repo,
            } => {
                if object == "repository" {
                    self.fmt(StringKey::EventDeleteRepoTitle, &[&actor, deleted])
                } else {
                    let (owner, name) = owner_and_name(repository, repo);
                    self.fmt(
                        StringKey::EventDeleteBranchTitle,
                        &[&actor, ref_type, git_ref, &owner, &name],
                    )
                }
            }
            EventKind::Wiki { action, repo } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(StringKey::EventWikiTitle, &[&actor, action, &owner, &name])
            }
            EventKind::Member { member, repo } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(StringKey::EventMemberTitle, &[&actor, member, &owner, &name])
            }
            EventKind::Download { repo, .. } => {
                let (owner, name) = owner_and_name(repository, repo);
                self.fmt(StringKey::EventDownloadTitle, &[&actor, &owner, &name])
            }
            EventKind::Gollum {
                action,
                title,
                repo,
                ..
            } => {
                let full = repo_string(repository, repo);
                self.fmt(StringKey::EventGollumTitle, &[&actor, action, title, &full])
            }
            EventKind::Public { repo } => {
                let full = repo_string(repository, repo);
                self.fmt(StringKey::EventPublicTitle, &[&actor, &full])
            }
            EventKind::Other(_) => String::new(),
        }
    }

    pub fn description(&self, event: &FeedEvent) -> Description {
        let repository = event.repository.as_ref();

        match &event.kind {
            EventKind::Push { commits, .. } => {
                if commits.is_empty() {
                    return Description::Hidden;
                }
                let lines = commits
                    .iter()
                    .take(MAX_PUSH_LINES)
                    .map(|c| CommitLine {
                        short_sha: short_sha(&c.sha).to_string(),
                        message: c.message.lines().next().unwrap_or_default().to_string(),
                    })
                    .collect();
                let more = (commits.len() > MAX_PUSH_LINES).then(|| {
                    let remaining = commits.len() - MAX_PUSH_LINES;
                    self.fmt(StringKey::EventPushDesc, &[&remaining])
                });
                Description::Commits { lines, more }
            }
            EventKind::CommitComment { commit, .. } => Description::CommitComment {
                prefix: self.templates.get(StringKey::EventCommitCommentDesc).to_string(),
                short_sha: short_sha(commit).to_string(),
                sha: commit.clone(),
            },
            EventKind::PullRequest { pull_request, .. } => match pull_request {
                Some(pr) => Description::text(self.fmt(
                    StringKey::EventPullRequestDesc,
                    &[&pr.title, &pr.commits, &pr.additions, &pr.deletions],
                )),
                None => Description::Hidden,
            },
            EventKind::Follow { target, .. } => match target {
                Some(t) => Description::text(self.fmt(
                    StringKey::EventFollowDesc,
                    &[&t.login, &t.repos, &t.followers],
                )),
                None => Description::Hidden,
            },
            EventKind::Watch { .. } => match repository {
                Some(r) => Description::text(self.teaser(r.description.as_deref())),
                None => Description::Hidden,
            },
            EventKind::Fork { repo, .. } => {
                let forked_name = match repository {
                    Some(r) => r.name.clone(),
                    None => repo_basename(repo.as_deref()).unwrap_or_default(),
                };
                let forked = format!("{}/{}", event.actor, forked_name);
                Description::text(self.fmt(StringKey::EventForkDesc, &[&forked]))
            }
            EventKind::Create {
                object,
                name,
                object_name,
                ..
            } => {
                let actor = event.actor.as_str();
                match object.as_str() {
                    "repository" => Description::text(
                        self.fmt(StringKey::EventCreateRepoDesc, &[&actor, name]),
                    ),
                    "branch" | "tag" => Description::text(self.fmt(
                        StringKey::EventCreateBranchDesc,
                        &[object, &actor, name, object_name],
                    )),
                    _ => Description::Hidden,
                }
            }
            EventKind::Download { url, .. } => {
                let filename = url.rsplit_once('/').map(|(_, f)| f).unwrap_or(url);
                Description::text(filename)
            }
            EventKind::Gollum { title, .. } => {
                Description::text(self.fmt(StringKey::EventGollumDesc, &[title]))
            }
            EventKind::Public { repo } => match repository {
                Some(r) => Description::text(self.teaser(r.description.as_deref())),
                None => Description::text(repo.clone().unwrap_or_default()),
            },
            EventKind::Issues { .. }
            | EventKind::Gist { .. }
            | EventKind::ForkApply { .. }
            | EventKind::Delete { .. }
            | EventKind::Wiki { .. }
            | EventKind::Member { .. }
            | EventKind::Other(_) => Description::Hidden,
        }
    }

    fn teaser(&self, text: Option<&str>) -> String {
        teaser(text.unwrap_or_default(), self.teaser_len)
    }
}

/// Owner and name of the event's repository: the structured reference
/// when attached, otherwise the payload `owner/name` split at the first
/// slash. A payload repo without a slash is all owner.
fn owner_and_name<'e>(
    repository: Option<&'e Repository>,
    payload_repo: &'e Option<String>,
) -> (&'e str, &'e str) {
    match repository {
        Some(r) => (r.owner.as_str(), r.name.as_str()),
        None => {
            let repo = payload_repo.as_deref().unwrap_or_default();
            repo.split_once('/').unwrap_or((repo, ""))
        }
    }
}

/// Single `owner/name` string for kinds whose template takes one repo
/// argument.
fn repo_string(repository: Option<&Repository>, payload_repo: &Option<String>) -> String {
    match (repository, payload_repo.as_deref()) {
        (Some(r), _) => r.full_name(),
        (None, Some(repo)) if !repo.trim().is_empty() => repo.to_string(),
        _ => String::new(),
    }
}

pub fn pull_request_action(action: &str) -> &str {
    if action == "closed" {
        "merged"
    } else {
        action
    }
}

pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(SHORT_SHA_LEN) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

/// First non-blank line of `text`, cut to `max_chars` with a trailing
/// ellipsis. Never longer than `max_chars`; below 3 there is no room for
/// the ellipsis and the line is just cut.
pub fn teaser(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let first = text.lines().next().unwrap_or_default().trim();
    let truncated = first.chars().count() > max_chars;
    if !truncated && first.len() == text.len() {
        return first.to_string();
    }
    if max_chars < 3 {
        return first.chars().take(max_chars).collect();
    }
    if truncated {
        let cut: String = first.chars().take(max_chars - 3).collect();
        format!("{}...", cut.trim_end())
    } else if first.chars().count() + 3 <= max_chars {
        format!("{}...", first)
    } else {
        let cut: String = first.chars().take(max_chars - 3).collect();
        format!("{}...", cut.trim_end())
    }
}
