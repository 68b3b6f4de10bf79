mod app;
mod config;
mod data;
mod event;
mod logging;
mod model;
mod strings;
mod ui;
mod watcher;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::event::{self as ct_event, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use url::Url;

use crate::app::{App, AppOptions, FeedPane};
use crate::config::AppConfig;
use crate::data::cli_detect;
use crate::data::feed::{self, FeedKind};
use crate::data::formatter::Formatter;
use crate::data::handlers::{CommandStarter, HandlerRegistry};
use crate::data::launcher::{ActivityStarter, LaunchOutcome, Launcher, PackageResolver, Resolution};
use crate::event::AppEvent;
use crate::model::intent::ChooserCandidate;
use crate::strings::{StringKey, Templates};

#[derive(Parser)]
#[command(
    name = "octofeed",
    version,
    about = "GitHub activity feed in the terminal",
    override_help = HELP_TEXT,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory to read .octofeed.toml from (defaults to current directory)
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Read events from a JSON file instead of gh
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// GitHub login for the News Feed and Activity feeds
    #[arg(long, global = true)]
    user: Option<String>,

    /// Log to stderr instead of the log file (subcommands only)
    #[arg(long, global = true)]
    log_stderr: bool,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the rendered feed to stdout
    Render {
        /// Feed to fetch with gh
        #[arg(long, value_enum)]
        feed: Option<FeedKind>,

        /// Print at most this many events
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Open a link in an external handler
    Open {
        uri: String,

        /// MIME type of the link (guessed from the path when omitted)
        #[arg(long)]
        mime: Option<String>,
    },
    /// List the handlers a link would be offered to
    Handlers {
        uri: String,

        #[arg(long)]
        mime: Option<String>,
    },
}

const HELP_TEXT: &str = "\
octofeed - GitHub activity feed in the terminal

USAGE:
  octofeed [OPTIONS]                       Start the TUI
  octofeed render [--feed KIND] [--limit N] Print the rendered feed
  octofeed open <URI> [--mime TYPE]        Open a link in an external handler
  octofeed handlers <URI> [--mime TYPE]    List handlers for a link

GLOBAL OPTIONS:
  --cwd <DIR>       Directory to read .octofeed.toml from [default: current dir]
  --file <PATH>     Read events from a JSON file (watched for changes)
  --user <LOGIN>    GitHub login for the News Feed / Activity feeds
                    [default: feed.user, then `gh api user`]
  --log-stderr      Log to stderr instead of the log file
  -h, --help        Print this help
  -V, --version     Print version

FEEDS (--feed):
  received          News Feed: events from people and repos the user follows
  performed         Activity: events performed by the user
  public            Public timeline

TUI KEYBINDINGS:
  1-9                Jump to feed by number
  Tab / Shift+Tab    Cycle feeds
  j/k  Up/Down       Navigate list / scroll detail
  h/l  Left/Right    Switch panes
  g / G              Jump to top / bottom
  Enter              Show detail / open link
  o                  Open event link
  u                  Open actor profile
  r                  Refresh feed
  ?                  Toggle help overlay
  q / Ctrl+C         Quit

LOGGING:
  Logs go to <data dir>/octofeed/logs; set RUST_LOG to change the filter.

EXAMPLES:
  octofeed --user octocat
  octofeed --file events.json
  octofeed render --feed public --limit 10
  octofeed open https://github.com/rust-lang/rust";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let to_stderr = cli.log_stderr && cli.command.is_some();
    if let Err(e) = logging::init_tracing(to_stderr) {
        eprintln!("warning: logging disabled: {:#}", e);
    }

    let cwd = resolve_cwd(cli.cwd)?;
    let config = config::load_config(&cwd);
    let feed_file = cli
        .file
        .or_else(|| config.feed_file().map(|p| cwd.join(p)));
    let user = cli.user.or_else(|| config.feed_user().map(String::from));

    match cli.command {
        Some(Command::Render { feed, limit }) => {
            render_feed(&config, feed_file.as_deref(), user, feed, limit)
        }
        Some(Command::Open { uri, mime }) => open_link(&config, &uri, mime),
        Some(Command::Handlers { uri, mime }) => list_handlers(&config, &uri, mime),
        None => {
            let has_gh = feed_file.is_none() && cli_detect::is_available("gh");
            let user = if has_gh {
                user.or_else(cli_detect::detect_gh_user)
            } else {
                user
            };
            run_tui(AppOptions {
                config,
                feed_file,
                user,
                has_gh,
            })
        }
    }
}

fn resolve_cwd(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(p) => std::fs::canonicalize(&p)
            .with_context(|| format!("cannot resolve {}", p.display())),
        None => Ok(std::env::current_dir()?),
    }
}

fn render_feed(
    config: &AppConfig,
    feed_file: Option<&Path>,
    user: Option<String>,
    kind: Option<FeedKind>,
    limit: Option<usize>,
) -> Result<()> {
    let events = match feed_file {
        Some(path) => feed::load_feed_file(path)?,
        None => {
            let user = user.or_else(cli_detect::detect_gh_user);
            let kind = kind.unwrap_or(if user.is_some() {
                FeedKind::Received
            } else {
                FeedKind::Public
            });
            feed::fetch_feed(kind, user.as_deref(), config.per_page())?
        }
    };

    let templates = Templates::with_overrides(&config.string_overrides());
    let formatter = Formatter::new(&templates).with_teaser_len(config.teaser_length());

    let mut out = io::stdout().lock();
    for event in events.iter().take(limit.unwrap_or(usize::MAX)) {
        let row = formatter.render(event);
        if row.title.is_empty() && row.description.is_hidden() {
            tracing::debug!(kind = event.type_name(), "skipping unrendered event");
            continue;
        }
        writeln!(out, "{}", row.title)?;
        for line in row.description.lines() {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}

fn build_launcher(config: &AppConfig) -> Launcher<HandlerRegistry, CommandStarter> {
    let registry = HandlerRegistry::from_config(config);
    let starter = registry.starter();
    Launcher::new(registry, starter)
}

/// MIME type given on the command line, or guessed from the URI path.
fn link_mime(uri: &Url, mime: Option<String>) -> Option<String> {
    mime.or_else(|| {
        mime_guess::from_path(uri.path())
            .first()
            .map(|m| m.essence_str().to_string())
    })
}

fn open_link(config: &AppConfig, uri: &str, mime: Option<String>) -> Result<()> {
    let uri = Url::parse(uri).with_context(|| format!("invalid URI {}", uri))?;
    let templates = Templates::with_overrides(&config.string_overrides());
    let launcher = build_launcher(config);

    match launch_link(&launcher, &uri, mime, prompt_choice)? {
        Some(label) => println!("{}", templates.format(StringKey::OpenedIn, &[&label])),
        None => eprintln!("{}", templates.get(StringKey::NoBrowserFound)),
    }
    Ok(())
}

/// Launch `uri` and return the label of the handler it opened in. `None`
/// means no handler was found, which is a notice and not an error.
fn launch_link<R: PackageResolver, S: ActivityStarter>(
    launcher: &Launcher<R, S>,
    uri: &Url,
    mime: Option<String>,
    choose: impl FnOnce(&[ChooserCandidate]) -> Result<usize>,
) -> Result<Option<String>> {
    let outcome = match link_mime(uri, mime) {
        Some(mime) => launcher.launch_viewer_or_browser(uri, &mime)?,
        None => launcher.launch_or_choose(uri)?,
    };

    match outcome {
        LaunchOutcome::Launched(candidate) => Ok(Some(candidate.label)),
        LaunchOutcome::NoHandler => Ok(None),
        LaunchOutcome::Choose(candidates) => {
            let idx = choose(&candidates)?;
            let Some(candidate) = candidates.get(idx) else {
                bail!("no handler selected");
            };
            launcher.start(candidate)?;
            Ok(Some(candidate.label.clone()))
        }
    }
}

/// Ask on stdin which candidate to start. Returns its index.
fn prompt_choice(candidates: &[ChooserCandidate]) -> Result<usize> {
    let mut err = io::stderr().lock();
    for (i, c) in candidates.iter().enumerate() {
        writeln!(err, "  {}) {}", i + 1, c.label)?;
    }
    write!(err, "Open with [1-{}]: ", candidates.len())?;
    err.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    match line.trim().parse::<usize>() {
        Ok(n) if (1..=candidates.len()).contains(&n) => Ok(n - 1),
        _ => bail!("no handler selected"),
    }
}

fn list_handlers(config: &AppConfig, uri: &str, mime: Option<String>) -> Result<()> {
    let uri = Url::parse(uri).with_context(|| format!("invalid URI {}", uri))?;
    let launcher = build_launcher(config);

    let resolution = match link_mime(&uri, mime) {
        Some(mime) => launcher.create_viewer_or_browser_intent(&uri, &mime),
        None => launcher.create_browser_intent(&uri),
    };
    let candidates = match resolution {
        None => Vec::new(),
        Some(Resolution::Single(candidate)) => vec![candidate],
        Some(Resolution::Chooser(candidates)) => candidates,
    };
    if candidates.is_empty() {
        println!("No handlers for {}", uri);
    }
    for c in &candidates {
        println!("{}\t{}", c.package, c.label);
    }
    Ok(())
}

fn run_tui(options: AppOptions) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, options);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "app exited with error");
        eprintln!("Error: {:#}", e);
    }
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    options: AppOptions,
) -> Result<()> {
    let mut app = App::new(options);

    // Create event channel before initial load so background loads can send results
    let (tx, rx) = mpsc::channel::<AppEvent>();
    app.event_tx = Some(tx.clone());

    app.load_all();

    let _debouncer = match &app.feed_file {
        Some(path) => Some(watcher::start_watcher(path.clone(), tx)?),
        None => None,
    };

    let tick_rate = Duration::from_millis(app.config.tick_rate());
    let mut last_tick = Instant::now();

    loop {
        // Draw only when dirty
        if app.dirty {
            terminal.draw(|f| ui::draw(f, &app))?;
            app.dirty = false;
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        if ct_event::poll(timeout)? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key);
                    app.mark_dirty();
                }
            }
        }

        // Background loads and file watcher
        while let Ok(evt) = rx.try_recv() {
            app.handle_event(evt);
            app.mark_dirty();
        }

        // Tick
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            app.poll_feeds();
            app.clear_stale_notice();
            // Relative timestamps age
            app.mark_dirty();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keybindings (always active)
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Char('h') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        _ => {}
    }

    // Don't process other keys when help is showing
    if app.show_help {
        return;
    }

    // Handler chooser: number keys or Enter start a handler
    if app.chooser.is_some() {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => app.cancel_chooser(),
            KeyCode::Char('j') | KeyCode::Down => app.chooser_down(),
            KeyCode::Char('k') | KeyCode::Up => app.chooser_up(),
            KeyCode::Enter => app.confirm_chooser(),
            KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                let idx = (c as usize) - ('1' as usize);
                app.chooser_select(idx);
            }
            _ => {}
        }
        return;
    }

    // Quit
    if key.code == KeyCode::Char('q') {
        app.should_quit = true;
        return;
    }

    match key.code {
        // Tab switching
        KeyCode::Tab => app.next_tab(),
        KeyCode::BackTab => app.prev_tab(),

        // Dynamic number keys
        KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
            let idx = (c as usize) - ('1' as usize);
            let tabs = app.visible_tabs();
            if let Some(tab) = tabs.get(idx) {
                app.switch_to_tab(*tab);
            }
        }

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.navigate_down(),
        KeyCode::Char('k') | KeyCode::Up => app.navigate_up(),
        KeyCode::Char('h') | KeyCode::Left => app.navigate_left(),
        KeyCode::Char('l') | KeyCode::Right => app.navigate_right(),
        KeyCode::Char('g') => app.jump_top(),
        KeyCode::Char('G') => app.jump_bottom(),
        KeyCode::Enter => app.select_item(),
        KeyCode::Esc if app.pane == FeedPane::Detail => app.navigate_left(),

        // Links
        KeyCode::Char('o') => app.open_selected_link(),
        KeyCode::Char('u') => app.open_selected_actor(),

        KeyCode::Char('r') => app.refresh_current(),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher(config: &str) -> Launcher<HandlerRegistry, CommandStarter> {
        let config: AppConfig = toml::from_str(config).unwrap();
        build_launcher(&config)
    }

    #[test]
    fn open_without_handlers_is_not_an_error() {
        let launcher = launcher("[launcher]\nsystem = false\n");
        let uri = Url::parse("https://github.com/octo/hello").unwrap();
        let opened = launch_link(&launcher, &uri, None, |_| bail!("no chooser expected")).unwrap();
        assert_eq!(opened, None);
    }

    #[test]
    fn open_reports_the_chosen_handler() {
        let launcher = launcher(
            r#"
            [launcher]
            system = false

            [[launcher.handlers]]
            id = "first"
            name = "First"
            command = ["true"]

            [[launcher.handlers]]
            id = "second"
            name = "Second"
            command = ["true"]
            "#,
        );
        let uri = Url::parse("https://github.com/octo/hello").unwrap();
        let opened = launch_link(&launcher, &uri, None, |candidates| {
            assert_eq!(candidates.len(), 2);
            Ok(1)
        })
        .unwrap();
        assert_eq!(opened.as_deref(), Some("Second"));
    }
}
