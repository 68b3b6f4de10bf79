use std::collections::HashMap;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use crate::config::{AppConfig, HandlerConfig};
use crate::data::launcher::{ActivityStarter, PackageResolver, OWN_PACKAGE};
use crate::model::intent::{Category, HandlerInfo, Intent};

pub const SYSTEM_PACKAGE: &str = "system";

/// Hosts this app registers itself for.
const OWN_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSpec {
    pub package: String,
    pub label: String,
    /// Empty means "hand the URI to the OS opener".
    pub command: Vec<String>,
    pub schemes: Vec<String>,
    pub hosts: Vec<String>,
    pub mime: Vec<String>,
    pub browsable: bool,
    pub enabled: bool,
    pub exported: bool,
}

impl HandlerSpec {
    fn from_config(c: &HandlerConfig) -> Self {
        let schemes = if c.schemes.is_empty() {
            vec!["http".to_string(), "https".to_string()]
        } else {
            c.schemes.iter().map(|s| s.to_ascii_lowercase()).collect()
        };
        HandlerSpec {
            package: c.id.clone(),
            label: c.name.clone().unwrap_or_else(|| c.id.clone()),
            command: c.command.clone(),
            schemes,
            hosts: c.hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            mime: c.mime.clone(),
            browsable: c.browsable.unwrap_or(true),
            enabled: c.enabled.unwrap_or(true),
            exported: c.exported.unwrap_or(true),
        }
    }

    fn system() -> Self {
        HandlerSpec {
            package: SYSTEM_PACKAGE.to_string(),
            label: "System default".to_string(),
            command: Vec::new(),
            schemes: vec!["http".into(), "https".into(), "file".into(), "mailto".into()],
            hosts: Vec::new(),
            mime: vec!["*/*".to_string()],
            browsable: true,
            enabled: true,
            exported: true,
        }
    }

    fn own() -> Self {
        HandlerSpec {
            package: OWN_PACKAGE.to_string(),
            label: "octofeed".to_string(),
            command: Vec::new(),
            schemes: vec!["http".into(), "https".into()],
            hosts: OWN_HOSTS.iter().map(|h| h.to_string()).collect(),
            mime: Vec::new(),
            browsable: true,
            enabled: true,
            exported: true,
        }
    }

    pub fn matches(&self, intent: &Intent) -> bool {
        let scheme = intent.data.scheme();
        if !self.schemes.iter().any(|s| s == scheme) {
            return false;
        }
        if !self.hosts.is_empty() {
            let Some(host) = intent.data.host_str().map(str::to_ascii_lowercase) else {
                return false;
            };
            if !self.hosts.iter().any(|h| *h == host) {
                return false;
            }
        }
        if intent.has_category(Category::Browsable) && !self.browsable {
            return false;
        }
        match intent.mime.as_deref() {
            Some(mime) => self.mime.iter().any(|p| mime_matches(p, mime)),
            None => true,
        }
    }

    fn info(&self) -> HandlerInfo {
        HandlerInfo {
            package: self.package.clone(),
            label: self.label.clone(),
            enabled: self.enabled,
            exported: self.exported,
        }
    }
}

/// `image/*` matches any image type, `*/*` matches everything.
pub fn mime_matches(pattern: &str, mime: &str) -> bool {
    let (p_type, p_sub) = pattern.split_once('/').unwrap_or((pattern, "*"));
    let (m_type, m_sub) = mime.split_once('/').unwrap_or((mime, ""));
    (p_type == "*" || p_type.eq_ignore_ascii_case(m_type))
        && (p_sub == "*" || p_sub.eq_ignore_ascii_case(m_sub))
}

/// Handlers known on this machine: the app itself, the OS opener and
/// everything declared in config.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    handlers: Vec<HandlerSpec>,
}

impl HandlerRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut handlers = vec![HandlerSpec::own()];
        if config.system_handler_enabled() {
            handlers.push(HandlerSpec::system());
        }
        for c in config.handlers() {
            if handlers.iter().any(|h| h.package == c.id) {
                tracing::warn!(id = %c.id, "duplicate handler id ignored");
                continue;
            }
            handlers.push(HandlerSpec::from_config(c));
        }
        HandlerRegistry { handlers }
    }

    pub fn starter(&self) -> CommandStarter {
        CommandStarter {
            commands: self
                .handlers
                .iter()
                .map(|h| (h.package.clone(), h.command.clone()))
                .collect(),
        }
    }
}

impl PackageResolver for HandlerRegistry {
    fn query_intent_activities(&self, intent: &Intent) -> Vec<HandlerInfo> {
        self.handlers
            .iter()
            .filter(|h| h.matches(intent))
            .map(HandlerSpec::info)
            .collect()
    }
}

/// Spawns the configured command of the package an intent is pinned to.
#[derive(Debug, Clone, Default)]
pub struct CommandStarter {
    commands: HashMap<String, Vec<String>>,
}

impl ActivityStarter for CommandStarter {
    fn start_activity(&self, intent: &Intent) -> Result<()> {
        let Some(package) = intent.package.as_deref() else {
            bail!("intent is not pinned to a handler");
        };
        let Some(command) = self.commands.get(package) else {
            bail!("unknown handler {}", package);
        };
        let uri = intent.data.as_str();

        let Some((program, args)) = command.split_first() else {
            return opener::open(uri).with_context(|| format!("cannot open {}", uri));
        };
        let mut child = Command::new(program)
            .args(args)
            .arg(uri)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to run {}", program))?;
        tracing::debug!(package, pid = child.id(), "started handler");

        // Reap the handler when it exits.
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "failed to wait for handler");
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::launcher::{build_dummy_uri, LaunchOutcome, Launcher};
    use url::Url;

    fn registry(extra: &str) -> HandlerRegistry {
        let config: AppConfig = toml::from_str(extra).unwrap();
        HandlerRegistry::from_config(&config)
    }

    fn packages(infos: Vec<HandlerInfo>) -> Vec<String> {
        infos.into_iter().map(|i| i.package).collect()
    }

    #[test]
    fn mime_patterns() {
        assert!(mime_matches("*/*", "image/png"));
        assert!(mime_matches("image/*", "image/png"));
        assert!(mime_matches("IMAGE/PNG", "image/png"));
        assert!(!mime_matches("image/*", "text/html"));
        assert!(!mime_matches("text/plain", "text/html"));
    }

    #[test]
    fn own_handler_only_matches_real_host() {
        let reg = registry("");
        let real = Url::parse("https://github.com/octo/hello").unwrap();
        let browse = Intent::view(real.clone()).with_category(Category::Browsable);
        assert_eq!(
            packages(reg.query_intent_activities(&browse)),
            vec![OWN_PACKAGE, SYSTEM_PACKAGE]
        );

        let dummy = Intent::view(build_dummy_uri(&real)).with_category(Category::Browsable);
        assert_eq!(
            packages(reg.query_intent_activities(&dummy)),
            vec![SYSTEM_PACKAGE]
        );
    }

    #[test]
    fn typed_intents_need_a_mime_match() {
        let reg = registry(
            r#"
            [launcher]
            system = false

            [[launcher.handlers]]
            id = "feh"
            mime = ["image/*"]
            browsable = false

            [[launcher.handlers]]
            id = "firefox"
            name = "Firefox"
            "#,
        );
        let uri = Url::parse("https://www.somedummy.com/a.png").unwrap();
        let typed = Intent::view(uri.clone()).with_mime("image/png");
        assert_eq!(packages(reg.query_intent_activities(&typed)), vec!["feh"]);

        let browse = Intent::view(uri).with_category(Category::Browsable);
        assert_eq!(packages(reg.query_intent_activities(&browse)), vec!["firefox"]);
    }

    #[test]
    fn launcher_over_registry_offers_chooser_without_self() {
        let reg = registry(
            r#"
            [[launcher.handlers]]
            id = "firefox"
            name = "Firefox"
            command = ["true"]
            "#,
        );
        let starter = reg.starter();
        let launcher = Launcher::new(reg, starter);
        let uri = Url::parse("https://github.com/octo/hello").unwrap();
        match launcher.launch_or_choose(&uri).unwrap() {
            LaunchOutcome::Choose(candidates) => {
                let labels: Vec<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
                assert_eq!(labels, vec!["Firefox", "System default"]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn only_self_registered_means_no_handler() {
        let reg = registry("[launcher]\nsystem = false\n");
        let starter = reg.starter();
        let launcher = Launcher::new(reg, starter);
        let uri = Url::parse("https://github.com/octo/hello").unwrap();
        assert_eq!(
            launcher.launch_or_choose(&uri).unwrap(),
            LaunchOutcome::NoHandler
        );
    }

    #[test]
    fn starter_rejects_unpinned_intents() {
        let starter = registry("").starter();
        let intent = Intent::view(Url::parse("https://example.com").unwrap());
        assert!(starter.start_activity(&intent).is_err());
    }

    #[test]
    fn starter_runs_the_pinned_command() {
        let starter = registry(
            r#"
            [[launcher.handlers]]
            id = "quiet"
            command = ["true"]
            "#,
        )
        .starter();
        let mut intent = Intent::view(Url::parse("https://example.com/a").unwrap());
        intent.package = Some("quiet".into());
        starter.start_activity(&intent).unwrap();

        intent.package = Some("missing".into());
        assert!(starter.start_activity(&intent).is_err());
    }
}
