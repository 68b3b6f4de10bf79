use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

pub const GITHUB_WEB: &str = "https://github.com";

/// Structured repository reference attached to a legacy feed event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ActorAttributes {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gravatar_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PullRequestSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FollowTarget {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub repos: u64,
    #[serde(default)]
    pub followers: u64,
}

/// One case per event kind. `repo` is always the payload-level
/// `owner/name` string, used only when the event has no structured
/// repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push {
        git_ref: String,
        repo: Option<String>,
        commits: Vec<CommitSummary>,
    },
    Issues {
        action: String,
        number: u64,
        repo: Option<String>,
        html_url: Option<String>,
    },
    CommitComment {
        commit: String,
        repo: Option<String>,
    },
    PullRequest {
        action: String,
        number: u64,
        repo: Option<String>,
        pull_request: Option<PullRequestSummary>,
    },
    Watch {
        action: String,
        repo: Option<String>,
    },
    Gist {
        action: String,
        name: String,
        url: Option<String>,
    },
    Fork {
        repo: Option<String>,
        html_url: Option<String>,
    },
    ForkApply {
        repo: Option<String>,
    },
    Follow {
        target: Option<FollowTarget>,
        target_id: Option<u64>,
    },
    Create {
        object: String,
        name: String,
        object_name: String,
        repo: Option<String>,
    },
    Delete {
        object: String,
        name: String,
        ref_type: String,
        git_ref: String,
        repo: Option<String>,
    },
    Wiki {
        action: String,
        repo: Option<String>,
    },
    Member {
        member: String,
        repo: Option<String>,
    },
    Download {
        url: String,
        repo: Option<String>,
    },
    Gollum {
        action: String,
        title: String,
        repo: Option<String>,
        html_url: Option<String>,
    },
    Public {
        repo: Option<String>,
    },
    /// Unrecognized event type, kept by name.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub actor: String,
    pub actor_attributes: Option<ActorAttributes>,
    pub created_at: Option<DateTime<Utc>>,
    pub repository: Option<Repository>,
    pub kind: EventKind,
}

impl FeedEvent {
    /// Payload-level `owner/name` string of the event, if its kind has one.
    pub fn payload_repo(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Push { repo, .. }
            | EventKind::Issues { repo, .. }
            | EventKind::CommitComment { repo, .. }
            | EventKind::PullRequest { repo, .. }
            | EventKind::Watch { repo, .. }
            | EventKind::Fork { repo, .. }
            | EventKind::ForkApply { repo }
            | EventKind::Create { repo, .. }
            | EventKind::Delete { repo, .. }
            | EventKind::Wiki { repo, .. }
            | EventKind::Member { repo, .. }
            | EventKind::Download { repo, .. }
            | EventKind::Gollum { repo, .. }
            | EventKind::Public { repo } => repo.as_deref(),
            EventKind::Gist { .. } | EventKind::Follow { .. } | EventKind::Other(_) => None,
        }
    }

    /// Web URL of the repository the event happened in.
    pub fn repo_url(&self) -> Option<String> {
        if let Some(repo) = &self.repository {
            return Some(
                repo.url
                    .clone()
                    .unwrap_or_else(|| format!("{}/{}", GITHUB_WEB, repo.full_name())),
            );
        }
        self.payload_repo()
            .filter(|r| !r.trim().is_empty())
            .map(|r| format!("{}/{}", GITHUB_WEB, r))
    }

    pub fn actor_url(&self) -> Option<String> {
        if self.actor.is_empty() {
            None
        } else {
            Some(format!("{}/{}", GITHUB_WEB, self.actor))
        }
    }

    /// The page this event points at, used when the row is opened.
    pub fn link_url(&self) -> Option<String> {
        let repo_url = self.repo_url();
        match &self.kind {
            EventKind::Push {
                git_ref, commits, ..
            } => {
                let base = repo_url?;
                match commits.as_slice() {
                    [only] => Some(format!("{}/commit/{}", base, only.sha)),
                    _ => Some(format!("{}/tree/{}", base, branch_of(git_ref))),
                }
            }
            EventKind::CommitComment { commit, .. } => {
                repo_url.map(|base| format!("{}/commit/{}", base, commit))
            }
            EventKind::Issues {
                number, html_url, ..
            } => html_url
                .clone()
                .or_else(|| repo_url.map(|base| format!("{}/issues/{}", base, number))),
            EventKind::PullRequest {
                number,
                pull_request,
                ..
            } => pull_request
                .as_ref()
                .and_then(|pr| pr.html_url.clone())
                .or_else(|| repo_url.map(|base| format!("{}/pull/{}", base, number))),
            EventKind::Gist { url, .. } => url.clone(),
            EventKind::Fork { html_url, .. } => html_url.clone().or(repo_url),
            EventKind::Follow { target, .. } => target
                .as_ref()
                .filter(|t| !t.login.is_empty())
                .map(|t| format!("{}/{}", GITHUB_WEB, t.login)),
            EventKind::Download { url, .. } if !url.is_empty() => Some(url.clone()),
            EventKind::Gollum { html_url, .. } => html_url
                .clone()
                .or_else(|| repo_url.map(|base| format!("{}/wiki", base))),
            EventKind::Other(_) => repo_url.or_else(|| self.actor_url()),
            _ => repo_url,
        }
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            EventKind::Push { .. } => "PushEvent",
            EventKind::Issues { .. } => "IssuesEvent",
            EventKind::CommitComment { .. } => "CommitCommentEvent",
            EventKind::PullRequest { .. } => "PullRequestEvent",
            EventKind::Watch { .. } => "WatchEvent",
            EventKind::Gist { .. } => "GistEvent",
            EventKind::Fork { .. } => "ForkEvent",
            EventKind::ForkApply { .. } => "ForkApplyEvent",
            EventKind::Follow { .. } => "FollowEvent",
            EventKind::Create { .. } => "CreateEvent",
            EventKind::Delete { .. } => "DeleteEvent",
            EventKind::Wiki { .. } => "WikiEvent",
            EventKind::Member { .. } => "MemberEvent",
            EventKind::Download { .. } => "DownloadEvent",
            EventKind::Gollum { .. } => "GollumEvent",
            EventKind::Public { .. } => "PublicEvent",
            EventKind::Other(name) => name,
        }
    }
}

/// Branch or tag name of a `refs/<kind>/<name>` ref. Bare names pass through.
pub fn branch_of(git_ref: &str) -> &str {
    match git_ref.strip_prefix("refs/") {
        Some(rest) => rest.split_once('/').map(|(_, name)| name).unwrap_or(rest),
        None => git_ref,
    }
}

// ---------------------------------------------------------------------------
// Wire decode
// ---------------------------------------------------------------------------

/// A login given either as a bare string (legacy feed) or as a user object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawUser {
    Login(String),
    Object {
        #[serde(default)]
        login: String,
        #[serde(default)]
        display_login: Option<String>,
        #[serde(default)]
        gravatar_id: Option<String>,
    },
}

impl RawUser {
    fn login(&self) -> &str {
        match self {
            RawUser::Login(login) => login,
            RawUser::Object { login, .. } => login,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRepoRef {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCommit {
    sha: String,
    message: String,
    author: Option<RawCommitAuthor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCommitAuthor {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIssue {
    number: u64,
    html_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComment {
    commit_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawForkee {
    html_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPage {
    title: String,
    action: String,
    html_url: Option<String>,
}

/// Every payload field any event kind uses, in both wire shapes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPayload {
    action: Option<String>,
    number: Option<u64>,
    repo: Option<String>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    ref_type: Option<String>,
    shas: Vec<Vec<Value>>,
    commits: Vec<RawCommit>,
    commit: Option<String>,
    comment: Option<RawComment>,
    pull_request: Option<PullRequestSummary>,
    issue: Option<RawIssue>,
    target: Option<FollowTarget>,
    target_id: Option<u64>,
    object: Option<String>,
    name: Option<String>,
    object_name: Option<String>,
    member: Option<RawUser>,
    url: Option<String>,
    title: Option<String>,
    pages: Vec<RawPage>,
    forkee: Option<RawForkee>,
}

#[derive(Debug, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    actor: Option<RawUser>,
    #[serde(default)]
    actor_attributes: Option<ActorAttributes>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    repository: Option<Value>,
    #[serde(default)]
    repo: Option<RawRepoRef>,
    #[serde(default)]
    payload: Option<Value>,
}

impl From<RawEvent> for FeedEvent {
    fn from(raw: RawEvent) -> Self {
        let actor = raw
            .actor
            .as_ref()
            .map(|a| a.login().to_string())
            .unwrap_or_default();
        let actor_attributes = raw.actor_attributes.or_else(|| match &raw.actor {
            Some(RawUser::Object {
                login,
                display_login,
                gravatar_id,
            }) => Some(ActorAttributes {
                login: login.clone(),
                name: display_login.clone(),
                gravatar_id: gravatar_id.clone(),
            }),
            _ => None,
        });
        let created_at = raw.created_at.as_deref().and_then(parse_timestamp);
        let repository = match raw.repository {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value::<Repository>(value) {
                Ok(repo) => Some(repo),
                Err(e) => {
                    tracing::debug!(kind = %raw.kind, error = %e, "partial repository ignored");
                    None
                }
            },
        };
        let payload = match raw.payload {
            None | Some(Value::Null) => Ok(RawPayload::default()),
            Some(value) => serde_json::from_value::<RawPayload>(value),
        };
        let kind = match payload {
            Ok(mut payload) => {
                if payload.repo.is_none() {
                    payload.repo = raw.repo.map(|r| r.name).filter(|n| !n.is_empty());
                }
                decode_kind(&raw.kind, payload)
            }
            Err(e) => {
                tracing::debug!(kind = %raw.kind, error = %e, "undecodable payload");
                EventKind::Other(raw.kind.clone())
            }
        };

        FeedEvent {
            actor,
            actor_attributes,
            created_at,
            repository,
            kind,
        }
    }
}

fn decode_kind(kind: &str, p: RawPayload) -> EventKind {
    let text = |v: Option<String>| v.unwrap_or_default();
    match kind {
        "PushEvent" => {
            let commits = if p.shas.is_empty() {
                p.commits
                    .into_iter()
                    .map(|c| CommitSummary {
                        sha: c.sha,
                        message: c.message,
                        author_name: c.author.and_then(|a| a.name),
                    })
                    .collect()
            } else {
                // Legacy tuples: [sha, email, message, name, distinct]
                p.shas
                    .iter()
                    .map(|row| {
                        let field = |i: usize| row.get(i).and_then(Value::as_str).map(String::from);
                        CommitSummary {
                            sha: field(0).unwrap_or_default(),
                            message: field(2).unwrap_or_default(),
                            author_name: field(3),
                        }
                    })
                    .collect()
            };
            EventKind::Push {
                git_ref: text(p.git_ref),
                repo: p.repo,
                commits,
            }
        }
        "IssuesEvent" => {
            let number = p
                .number
                .or_else(|| p.issue.as_ref().map(|i| i.number))
                .unwrap_or_default();
            EventKind::Issues {
                action: text(p.action),
                number,
                repo: p.repo,
                html_url: p.issue.and_then(|i| i.html_url),
            }
        }
        "CommitCommentEvent" => EventKind::CommitComment {
            commit: p
                .commit
                .or_else(|| p.comment.map(|c| c.commit_id))
                .unwrap_or_default(),
            repo: p.repo,
        },
        "PullRequestEvent" => EventKind::PullRequest {
            action: text(p.action),
            number: p.number.unwrap_or_default(),
            repo: p.repo,
            pull_request: p.pull_request,
        },
        "WatchEvent" => EventKind::Watch {
            action: text(p.action),
            repo: p.repo,
        },
        "GistEvent" => EventKind::Gist {
            action: text(p.action),
            name: text(p.name),
            url: p.url,
        },
        "ForkEvent" => EventKind::Fork {
            repo: p.repo,
            html_url: p.forkee.and_then(|f| f.html_url),
        },
        "ForkApplyEvent" => EventKind::ForkApply { repo: p.repo },
        "FollowEvent" => EventKind::Follow {
            target: p.target,
            target_id: p.target_id,
        },
        "CreateEvent" => {
            let name = p
                .name
                .clone()
                .or_else(|| repo_basename(p.repo.as_deref()))
                .unwrap_or_default();
            EventKind::Create {
                object: p.object.or(p.ref_type).unwrap_or_default(),
                name,
                object_name: p.object_name.or(p.git_ref).unwrap_or_default(),
                repo: p.repo,
            }
        }
        "DeleteEvent" => {
            let name = p
                .name
                .clone()
                .or_else(|| repo_basename(p.repo.as_deref()))
                .unwrap_or_default();
            EventKind::Delete {
                object: p.object.unwrap_or_default(),
                name,
                ref_type: text(p.ref_type),
                git_ref: text(p.git_ref),
                repo: p.repo,
            }
        }
        "WikiEvent" => EventKind::Wiki {
            action: text(p.action),
            repo: p.repo,
        },
        "MemberEvent" => EventKind::Member {
            member: p.member.map(|m| m.login().to_string()).unwrap_or_default(),
            repo: p.repo,
        },
        "DownloadEvent" => EventKind::Download {
            url: text(p.url),
            repo: p.repo,
        },
        "GollumEvent" => {
            let first = p.pages.into_iter().next();
            let (page_title, page_action, html_url) = match first {
                Some(page) => (Some(page.title), Some(page.action), page.html_url),
                None => (None, None, None),
            };
            EventKind::Gollum {
                action: p.action.or(page_action).unwrap_or_default(),
                title: p.title.or(page_title).unwrap_or_default(),
                repo: p.repo,
                html_url,
            }
        }
        "PublicEvent" => EventKind::Public { repo: p.repo },
        other => EventKind::Other(other.to_string()),
    }
}

/// Name part of an `owner/name` string.
pub fn repo_basename(repo: Option<&str>) -> Option<String> {
    repo.and_then(|r| r.rsplit('/').next())
        .filter(|n| !n.is_empty())
        .map(String::from)
}

/// Accepts RFC 3339 and the legacy `2011/04/06 12:34:56 -0700` form.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S %z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> FeedEvent {
        serde_json::from_value::<RawEvent>(value).unwrap().into()
    }

    #[test]
    fn decodes_legacy_push() {
        let event = decode(json!({
            "type": "PushEvent",
            "actor": "octocat",
            "created_at": "2011/04/06 12:34:56 -0700",
            "repository": {"owner": "octo", "name": "hello", "description": "Hi"},
            "payload": {
                "ref": "refs/heads/main",
                "shas": [["0123456789abcdef", "a@b.c", "Fix it", "Octo", true]]
            }
        }));
        assert_eq!(event.actor, "octocat");
        assert!(event.created_at.is_some());
        assert_eq!(event.repository.as_ref().unwrap().owner, "octo");
        match event.kind {
            EventKind::Push { git_ref, commits, .. } => {
                assert_eq!(git_ref, "refs/heads/main");
                assert_eq!(commits.len(), 1);
                assert_eq!(commits[0].message, "Fix it");
                assert_eq!(commits[0].author_name.as_deref(), Some("Octo"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn rest_repo_becomes_payload_repo_only() {
        let event = decode(json!({
            "type": "WatchEvent",
            "actor": {"login": "octocat", "display_login": "octocat"},
            "repo": {"name": "rust-lang/rust"},
            "created_at": "2024-05-01T10:00:00Z",
            "payload": {"action": "started"}
        }));
        assert!(event.repository.is_none());
        assert_eq!(event.payload_repo(), Some("rust-lang/rust"));
        assert_eq!(
            event.actor_attributes.as_ref().map(|a| a.login.as_str()),
            Some("octocat")
        );
    }

    #[test]
    fn rest_create_uses_ref_type_and_ref() {
        let event = decode(json!({
            "type": "CreateEvent",
            "actor": {"login": "octocat"},
            "repo": {"name": "octo/hello"},
            "payload": {"ref": "v1.0", "ref_type": "tag"}
        }));
        assert_eq!(
            event.kind,
            EventKind::Create {
                object: "tag".into(),
                name: "hello".into(),
                object_name: "v1.0".into(),
                repo: Some("octo/hello".into()),
            }
        );
    }

    #[test]
    fn unknown_type_is_other() {
        let event = decode(json!({"type": "SponsorshipEvent", "actor": "x"}));
        assert_eq!(event.kind, EventKind::Other("SponsorshipEvent".into()));
        assert_eq!(event.type_name(), "SponsorshipEvent");
    }

    #[test]
    fn bad_payload_degrades_to_other() {
        let event = decode(json!({
            "type": "IssuesEvent",
            "actor": "octocat",
            "payload": {"number": "seven"}
        }));
        assert_eq!(event.kind, EventKind::Other("IssuesEvent".into()));
        assert_eq!(event.actor, "octocat");
    }

    #[test]
    fn partial_repository_falls_back_to_payload_repo() {
        let event = decode(json!({
            "type": "WatchEvent",
            "actor": "octocat",
            "repository": {"name": "hello"},
            "payload": {"action": "started", "repo": "octo/hello"}
        }));
        assert!(event.repository.is_none());
        assert_eq!(event.payload_repo(), Some("octo/hello"));
        assert_eq!(
            event.kind,
            EventKind::Watch {
                action: "started".into(),
                repo: Some("octo/hello".into()),
            }
        );
    }

    #[test]
    fn branch_of_strips_ref_prefix() {
        assert_eq!(branch_of("refs/heads/main"), "main");
        assert_eq!(branch_of("refs/heads/feature/x"), "feature/x");
        assert_eq!(branch_of("main"), "main");
    }

    #[test]
    fn link_targets() {
        let event = decode(json!({
            "type": "CommitCommentEvent",
            "actor": "octocat",
            "repository": {"owner": "octo", "name": "hello"},
            "payload": {"commit": "abcdef0123"}
        }));
        assert_eq!(
            event.link_url().as_deref(),
            Some("https://github.com/octo/hello/commit/abcdef0123")
        );
        assert_eq!(event.actor_url().as_deref(), Some("https://github.com/octocat"));

        let event = decode(json!({
            "type": "PullRequestEvent",
            "actor": "octocat",
            "payload": {"repo": "octo/hello", "number": 7, "action": "opened"}
        }));
        assert_eq!(
            event.link_url().as_deref(),
            Some("https://github.com/octo/hello/pull/7")
        );
    }
}
