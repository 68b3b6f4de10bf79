use anyhow::Result;
use url::Url;

use crate::model::intent::{Category, ChooserCandidate, HandlerInfo, Intent};

/// Host swapped into URIs before resolving, so handlers registered for the
/// real host (this app included) don't shadow generic browsers.
pub const DUMMY_HOST: &str = "www.somedummy.com";

/// Package id of this application.
pub const OWN_PACKAGE: &str = "octofeed";

/// Lists handlers able to take an intent.
pub trait PackageResolver {
    fn query_intent_activities(&self, intent: &Intent) -> Vec<HandlerInfo>;
}

/// Starts a handler for a package-pinned intent.
pub trait ActivityStarter {
    fn start_activity(&self, intent: &Intent) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Single(ChooserCandidate),
    /// Two or more candidates, sorted by label.
    Chooser(Vec<ChooserCandidate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched(ChooserCandidate),
    /// The caller shows a selection dialog and starts the chosen candidate.
    Choose(Vec<ChooserCandidate>),
    /// Nothing but this app can open the link; the caller shows a notice.
    NoHandler,
}

pub struct Launcher<R, S> {
    resolver: R,
    starter: S,
    own_package: String,
}

impl<R: PackageResolver, S: ActivityStarter> Launcher<R, S> {
    pub fn new(resolver: R, starter: S) -> Self {
        Self::with_own_package(resolver, starter, OWN_PACKAGE)
    }

    pub fn with_own_package(resolver: R, starter: S, own_package: impl Into<String>) -> Self {
        Launcher {
            resolver,
            starter,
            own_package: own_package.into(),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Open `uri` in a browser other than this app.
    pub fn launch_or_choose(&self, uri: &Url) -> Result<LaunchOutcome> {
        let resolution = self.create_browser_intent(uri);
        self.dispatch(uri, resolution)
    }

    /// Open `uri` in a viewer for `mime`, or a browser when no viewer exists.
    pub fn launch_viewer_or_browser(&self, uri: &Url, mime: &str) -> Result<LaunchOutcome> {
        let resolution = self.create_viewer_or_browser_intent(uri, mime);
        self.dispatch(uri, resolution)
    }

    pub fn start(&self, candidate: &ChooserCandidate) -> Result<()> {
        tracing::info!(package = %candidate.package, uri = %candidate.intent.data, "starting handler");
        self.starter.start_activity(&candidate.intent)
    }

    pub fn create_browser_intent(&self, uri: &Url) -> Option<Resolution> {
        let query = Intent::view(build_dummy_uri(uri)).with_category(Category::Browsable);
        self.create_activity_chooser(&query, uri)
    }

    pub fn create_viewer_or_browser_intent(&self, uri: &Url, mime: &str) -> Option<Resolution> {
        let query = Intent::view(build_dummy_uri(uri)).with_mime(mime);
        self.create_activity_chooser(&query, uri)
            .or_else(|| self.create_browser_intent(uri))
    }

    fn create_activity_chooser(&self, query: &Intent, uri: &Url) -> Option<Resolution> {
        let mut activities = self.resolver.query_intent_activities(query);
        activities.sort_by_cached_key(|info| info.label.to_lowercase());

        let mut candidates: Vec<ChooserCandidate> = activities
            .into_iter()
            .filter(|info| info.enabled && info.exported)
            .filter(|info| info.package != self.own_package)
            .map(|info| {
                let mut intent = query.clone();
                intent.data = uri.clone();
                intent.package = Some(info.package.clone());
                ChooserCandidate {
                    package: info.package,
                    label: info.label,
                    intent,
                }
            })
            .collect();

        tracing::debug!(
            uri = %uri,
            mime = ?query.mime,
            candidates = candidates.len(),
            "resolved handlers"
        );

        match candidates.len() {
            0 => None,
            1 => candidates.pop().map(Resolution::Single),
            _ => Some(Resolution::Chooser(candidates)),
        }
    }

    fn dispatch(&self, uri: &Url, resolution: Option<Resolution>) -> Result<LaunchOutcome> {
        match resolution {
            None => {
                tracing::info!(uri = %uri, "no handler for link");
                Ok(LaunchOutcome::NoHandler)
            }
            Some(Resolution::Single(candidate)) => {
                self.start(&candidate)?;
                Ok(LaunchOutcome::Launched(candidate))
            }
            Some(Resolution::Chooser(candidates)) => Ok(LaunchOutcome::Choose(candidates)),
        }
    }
}

/// Same URI with the host replaced by [`DUMMY_HOST`]. URIs that cannot
/// carry a host are returned unchanged.
pub fn build_dummy_uri(uri: &Url) -> Url {
    let mut dummy = uri.clone();
    if !uri.cannot_be_a_base() && dummy.set_host(Some(DUMMY_HOST)).is_ok() {
        dummy
    } else {
        uri.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeResolver {
        handlers: Vec<HandlerInfo>,
        typed_handlers: Vec<HandlerInfo>,
        queries: RefCell<Vec<Intent>>,
    }

    impl FakeResolver {
        fn new(handlers: Vec<HandlerInfo>) -> Self {
            FakeResolver {
                handlers,
                typed_handlers: Vec::new(),
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl PackageResolver for FakeResolver {
        fn query_intent_activities(&self, intent: &Intent) -> Vec<HandlerInfo> {
            self.queries.borrow_mut().push(intent.clone());
            if intent.mime.is_some() {
                self.typed_handlers.clone()
            } else {
                self.handlers.clone()
            }
        }
    }

    #[derive(Default)]
    struct RecordingStarter {
        started: RefCell<Vec<Intent>>,
    }

    impl ActivityStarter for &RecordingStarter {
        fn start_activity(&self, intent: &Intent) -> Result<()> {
            self.started.borrow_mut().push(intent.clone());
            Ok(())
        }
    }

    fn handler(package: &str, label: &str) -> HandlerInfo {
        HandlerInfo {
            package: package.into(),
            label: label.into(),
            enabled: true,
            exported: true,
        }
    }

    fn uri() -> Url {
        Url::parse("https://github.com/octo/hello/commit/abc").unwrap()
    }

    #[test]
    fn dummy_uri_keeps_shape() {
        let dummy = build_dummy_uri(&uri());
        assert_eq!(
            dummy.as_str(),
            "https://www.somedummy.com/octo/hello/commit/abc"
        );
        let mailto = Url::parse("mailto:a@b.c").unwrap();
        assert_eq!(build_dummy_uri(&mailto), mailto);
    }

    #[test]
    fn no_candidates_means_no_handler_and_no_start() {
        let starter = RecordingStarter::default();
        let launcher = Launcher::new(FakeResolver::new(Vec::new()), &starter);
        let outcome = launcher.launch_or_choose(&uri()).unwrap();
        assert_eq!(outcome, LaunchOutcome::NoHandler);
        assert!(starter.started.borrow().is_empty());
    }

    #[test]
    fn single_candidate_launches_directly_with_original_uri() {
        let starter = RecordingStarter::default();
        let resolver = FakeResolver::new(vec![handler("firefox", "Firefox")]);
        let launcher = Launcher::new(resolver, &starter);
        let outcome = launcher.launch_or_choose(&uri()).unwrap();

        let started = starter.started.borrow();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].data, uri());
        assert_eq!(started[0].package.as_deref(), Some("firefox"));
        assert!(started[0].has_category(Category::Browsable));
        assert!(matches!(outcome, LaunchOutcome::Launched(c) if c.package == "firefox"));

        let queries = launcher.resolver().queries.borrow();
        assert_eq!(queries[0].data.host_str(), Some(DUMMY_HOST));
    }

    #[test]
    fn own_package_is_never_offered() {
        let starter = RecordingStarter::default();
        let resolver = FakeResolver::new(vec![handler(OWN_PACKAGE, "octofeed")]);
        let launcher = Launcher::new(resolver, &starter);
        assert_eq!(
            launcher.launch_or_choose(&uri()).unwrap(),
            LaunchOutcome::NoHandler
        );
        assert!(starter.started.borrow().is_empty());

        let resolver = FakeResolver::new(vec![
            handler("firefox", "Firefox"),
            handler(OWN_PACKAGE, "octofeed"),
            handler("chromium", "Chromium"),
        ]);
        let launcher = Launcher::new(resolver, &starter);
        match launcher.launch_or_choose(&uri()).unwrap() {
            LaunchOutcome::Choose(candidates) => {
                let packages: Vec<&str> =
                    candidates.iter().map(|c| c.package.as_str()).collect();
                assert_eq!(packages, vec!["chromium", "firefox"]);
                assert!(candidates.iter().all(|c| c.intent.data == uri()));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(starter.started.borrow().is_empty());
    }

    #[test]
    fn disabled_and_private_handlers_are_skipped() {
        let starter = RecordingStarter::default();
        let mut disabled = handler("a", "Alpha");
        disabled.enabled = false;
        let mut private = handler("b", "Beta");
        private.exported = false;
        let resolver = FakeResolver::new(vec![disabled, private, handler("c", "Gamma")]);
        let launcher = Launcher::new(resolver, &starter);
        let outcome = launcher.launch_or_choose(&uri()).unwrap();
        assert!(matches!(outcome, LaunchOutcome::Launched(c) if c.package == "c"));
    }

    #[test]
    fn viewer_is_preferred_and_keeps_mime() {
        let starter = RecordingStarter::default();
        let mut resolver = FakeResolver::new(vec![handler("firefox", "Firefox")]);
        resolver.typed_handlers = vec![handler("feh", "feh")];
        let launcher = Launcher::new(resolver, &starter);
        let outcome = launcher
            .launch_viewer_or_browser(&uri(), "image/png")
            .unwrap();
        assert!(matches!(outcome, LaunchOutcome::Launched(c) if c.package == "feh"));
        assert_eq!(starter.started.borrow()[0].mime.as_deref(), Some("image/png"));
    }

    #[test]
    fn viewer_falls_back_to_browser() {
        let starter = RecordingStarter::default();
        let resolver = FakeResolver::new(vec![handler("firefox", "Firefox")]);
        let launcher = Launcher::new(resolver, &starter);
        let resolution = launcher.create_viewer_or_browser_intent(&uri(), "image/png");
        match resolution {
            Some(Resolution::Single(c)) => {
                assert_eq!(c.package, "firefox");
                assert_eq!(c.intent.mime, None);
            }
            other => panic!("unexpected resolution {:?}", other),
        }
        assert_eq!(launcher.resolver().queries.borrow().len(), 2);
    }
}
