use std::collections::HashMap;
use std::fmt::{self, Write as _};

/// Keys of every user-visible template. Names match the `[strings]`
/// table of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKey {
    EventPushTitle,
    EventPushDesc,
    EventIssuesTitle,
    EventCommitCommentTitle,
    EventCommitCommentDesc,
    EventPullRequestTitle,
    EventPullRequestDesc,
    EventWatchTitle,
    EventGistTitle,
    EventForkTitle,
    EventForkDesc,
    EventForkApplyTitle,
    EventFollowTitle,
    EventFollowDesc,
    EventCreateRepoTitle,
    EventCreateRepoDesc,
    EventCreateBranchTitle,
    EventCreateBranchDesc,
    EventDeleteRepoTitle,
    EventDeleteBranchTitle,
    EventWikiTitle,
    EventMemberTitle,
    EventDownloadTitle,
    EventGollumTitle,
    EventGollumDesc,
    EventPublicTitle,
    NoBrowserFound,
    OpenedIn,
}

impl StringKey {
    pub const ALL: [StringKey; 28] = [
        StringKey::EventPushTitle,
        StringKey::EventPushDesc,
        StringKey::EventIssuesTitle,
        StringKey::EventCommitCommentTitle,
        StringKey::EventCommitCommentDesc,
        StringKey::EventPullRequestTitle,
        StringKey::EventPullRequestDesc,
        StringKey::EventWatchTitle,
        StringKey::EventGistTitle,
        StringKey::EventForkTitle,
        StringKey::EventForkDesc,
        StringKey::EventForkApplyTitle,
        StringKey::EventFollowTitle,
        StringKey::EventFollowDesc,
        StringKey::EventCreateRepoTitle,
        StringKey::EventCreateRepoDesc,
        StringKey::EventCreateBranchTitle,
        StringKey::EventCreateBranchDesc,
        StringKey::EventDeleteRepoTitle,
        StringKey::EventDeleteBranchTitle,
        StringKey::EventWikiTitle,
        StringKey::EventMemberTitle,
        StringKey::EventDownloadTitle,
        StringKey::EventGollumTitle,
        StringKey::EventGollumDesc,
        StringKey::EventPublicTitle,
        StringKey::NoBrowserFound,
        StringKey::OpenedIn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StringKey::EventPushTitle => "event_push_title",
            StringKey::EventPushDesc => "event_push_desc",
            StringKey::EventIssuesTitle => "event_issues_title",
            StringKey::EventCommitCommentTitle => "event_commit_comment_title",
            StringKey::EventCommitCommentDesc => "event_commit_comment_desc",
            StringKey::EventPullRequestTitle => "event_pull_request_title",
            StringKey::EventPullRequestDesc => "event_pull_request_desc",
            StringKey::EventWatchTitle => "event_watch_title",
            StringKey::EventGistTitle => "event_gist_title",
            StringKey::EventForkTitle => "event_fork_title",
            StringKey::EventForkDesc => "event_fork_desc",
            StringKey::EventForkApplyTitle => "event_fork_apply_title",
            StringKey::EventFollowTitle => "event_follow_title",
            StringKey::EventFollowDesc => "event_follow_desc",
            StringKey::EventCreateRepoTitle => "event_create_repo_title",
            StringKey::EventCreateRepoDesc => "event_create_repo_desc",
            StringKey::EventCreateBranchTitle => "event_create_branch_title",
            StringKey::EventCreateBranchDesc => "event_create_branch_desc",
            StringKey::EventDeleteRepoTitle => "event_delete_repo_title",
            StringKey::EventDeleteBranchTitle => "event_delete_branch_title",
            StringKey::EventWikiTitle => "event_wiki_title",
            StringKey::EventMemberTitle => "event_member_title",
            StringKey::EventDownloadTitle => "event_download_title",
            StringKey::EventGollumTitle => "event_gollum_title",
            StringKey::EventGollumDesc => "event_gollum_desc",
            StringKey::EventPublicTitle => "event_public_title",
            StringKey::NoBrowserFound => "no_browser_found",
            StringKey::OpenedIn => "opened_in",
        }
    }

    pub fn from_name(name: &str) -> Option<StringKey> {
        StringKey::ALL.into_iter().find(|k| k.name() == name)
    }

    fn default_template(self) -> &'static str {
        match self {
            StringKey::EventPushTitle => "{0} pushed to {1} at {2}/{3}",
            StringKey::EventPushDesc => "+{0} more commits",
            StringKey::EventIssuesTitle => "{0} {1} issue {2} on {3}/{4}",
            StringKey::EventCommitCommentTitle => "{0} commented on {1}/{2}",
            StringKey::EventCommitCommentDesc => "Comment in ",
            StringKey::EventPullRequestTitle => "{0} {1} pull request {2} on {3}/{4}",
            StringKey::EventPullRequestDesc => {
                "{0}\n{1} commits with {2} additions and {3} deletions"
            }
            StringKey::EventWatchTitle => "{0} {1} watching {2}/{3}",
            StringKey::EventGistTitle => "{0} {1} gist: {2}",
            StringKey::EventForkTitle => "{0} forked {1}/{2}",
            StringKey::EventForkDesc => "Forked repository is at {0}",
            StringKey::EventForkApplyTitle => "{0} applied fork commits to {1}/{2}",
            StringKey::EventFollowTitle => "{0} started following {1}",
            StringKey::EventFollowDesc => "{0} has {1} public repos and {2} followers",
            StringKey::EventCreateRepoTitle => "{0} created repository {1}",
            StringKey::EventCreateRepoDesc => "New repository is at {0}/{1}",
            StringKey::EventCreateBranchTitle => "{0} created {1} {2} at {3}/{4}",
            StringKey::EventCreateBranchDesc => "New {0} is at {1}/{2}/tree/{3}",
            StringKey::EventDeleteRepoTitle => "{0} deleted repository {1}",
            StringKey::EventDeleteBranchTitle => "{0} deleted {1} {2} at {3}/{4}",
            StringKey::EventWikiTitle => "{0} {1} a wiki page on {2}/{3}",
            StringKey::EventMemberTitle => "{0} added {1} to {2}/{3}",
            StringKey::EventDownloadTitle => "{0} uploaded a file to {1}/{2}",
            StringKey::EventGollumTitle => "{0} {1} the {2} wiki page in {3}",
            StringKey::EventGollumDesc => "Wiki page: {0}",
            StringKey::EventPublicTitle => "{0} open sourced {1}",
            StringKey::NoBrowserFound => "No application found to open this link",
            StringKey::OpenedIn => "Opened in {0}",
        }
    }
}

/// Resource bundle of format templates with English defaults.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    overrides: HashMap<StringKey, String>,
}

impl Templates {
    /// Build the bundle from a `[strings]` table. Unknown keys are logged
    /// and skipped.
    pub fn with_overrides(table: &HashMap<String, String>) -> Self {
        let mut overrides = HashMap::new();
        for (name, template) in table {
            match StringKey::from_name(name) {
                Some(key) => {
                    overrides.insert(key, template.clone());
                }
                None => tracing::warn!(key = %name, "unknown string key in config"),
            }
        }
        Templates { overrides }
    }

    pub fn get(&self, key: StringKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_template())
    }

    pub fn format(&self, key: StringKey, args: &[&dyn fmt::Display]) -> String {
        format_positional(self.get(key), args)
    }
}

/// Substitute `{N}` placeholders with `args[N]`. Out-of-range indices
/// produce nothing; anything that is not a placeholder is copied as is.
pub fn format_positional(template: &str, args: &[&dyn fmt::Display]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after.as_bytes().get(digits) == Some(&b'}') {
            if let Some(arg) = after[..digits].parse::<usize>().ok().and_then(|i| args.get(i)) {
                let _ = write!(out, "{}", arg);
            }
            rest = &after[digits + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_substitution() {
        let s = format_positional("{1} then {0}", &[&"a", &2]);
        assert_eq!(s, "2 then a");
    }

    #[test]
    fn missing_and_literal_braces() {
        assert_eq!(format_positional("x{5}y", &[&1]), "xy");
        assert_eq!(format_positional("{a} {", &[]), "{a} {");
    }

    #[test]
    fn every_key_round_trips_its_name() {
        for key in StringKey::ALL {
            assert_eq!(StringKey::from_name(key.name()), Some(key));
            assert!(!key.default_template().is_empty());
        }
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut table = HashMap::new();
        table.insert("event_fork_title".to_string(), "{0} gabelte {1}/{2}".to_string());
        table.insert("not_a_key".to_string(), "ignored".to_string());
        let templates = Templates::with_overrides(&table);
        assert_eq!(
            templates.format(StringKey::EventForkTitle, &[&"a", &"b", &"c"]),
            "a gabelte b/c"
        );
        assert_eq!(
            templates.get(StringKey::EventWatchTitle),
            "{0} {1} watching {2}/{3}"
        );
    }
}
