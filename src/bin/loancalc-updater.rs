//! Command-line host for the update flow.
//!
//! Runs one check to a terminal state: a silent startup check by default
//! (honoring the `check_on_startup` preference), or a user-requested check
//! with `--manual`. When a newer release is found the three usual choices
//! are offered; downloads and the install hand-off run exactly as they do
//! for an embedded host.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use loancalc::app_dirs;
use loancalc::config;
use loancalc::logging;
use loancalc::updater::{
    APP_NAME, UpdateController, UpdateDecision, UpdateEvent, UpdatePhase, open_settings,
};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = try_main() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

struct CliArgs {
    manual: bool,
    repo: Option<String>,
    feed_base: Option<String>,
    download_dir: Option<PathBuf>,
    choice: Option<UpdateDecision>,
}

fn try_main() -> Result<(), String> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    let config = config::load_or_default().map_err(|err| err.to_string())?;
    let mut settings = config.updates;
    if let Some(repo) = args.repo.clone() {
        settings.repo = repo;
    }
    if !args.manual && !settings.check_on_startup {
        tracing::info!("Startup checks are disabled; nothing to do");
        return Ok(());
    }

    let download_dir = match args.download_dir.clone() {
        Some(dir) => dir,
        None => app_dirs::downloads_dir().map_err(|err| err.to_string())?,
    };
    let mut controller =
        UpdateController::new(&settings, env!("CARGO_PKG_VERSION"), download_dir);
    if let Some(feed_base) = args.feed_base.clone() {
        controller = controller.with_feed_base(feed_base);
    }

    let mut events = if args.manual {
        controller.check_manually()
    } else {
        controller.check_automatically()
    };
    let mut failed = false;

    loop {
        for event in events.drain(..) {
            render_event(&event, &args, &mut failed);
        }
        match controller.phase() {
            UpdatePhase::Idle => {
                events = controller.poll();
                if events.is_empty() {
                    break;
                }
            }
            UpdatePhase::UpdateAvailable => {
                events = controller.resolve(choose(&args)?);
            }
            UpdatePhase::Fetching | UpdatePhase::Downloading => {
                std::thread::sleep(Duration::from_millis(50));
                events = controller.poll();
            }
        }
    }

    if failed && args.manual {
        Err("Update did not complete".to_string())
    } else {
        Ok(())
    }
}

fn render_event(event: &UpdateEvent, args: &CliArgs, failed: &mut bool) {
    match event {
        UpdateEvent::UpdateAvailable { tag, notes } => {
            println!("New version available: {tag}");
            println!("{notes}");
        }
        UpdateEvent::UpToDate => println!("You are on the latest version."),
        UpdateEvent::CheckFailed { message } => {
            *failed = true;
            println!("Update check failed: {message}");
        }
        UpdateEvent::DownloadStarted { with_progress } => {
            if *with_progress {
                println!("Downloading update...");
            } else {
                tracing::info!("Background download started");
            }
        }
        UpdateEvent::DownloadFailed { message } => {
            *failed = true;
            println!("Download failed: {message}");
        }
        UpdateEvent::InstallLaunched { artifact } => {
            println!("Installer started for {}", artifact.display());
        }
        UpdateEvent::InstallAuthorizationNeeded { settings } => {
            println!("Installing updates needs a one-time authorization.");
            println!("Allow it under {settings}, then run the update again.");
            if args.choice.is_none() && prompt_yes_no("Open the settings now?") {
                if let Err(err) = open_settings(settings) {
                    println!("Could not open settings: {err}");
                }
            }
        }
        UpdateEvent::InstallLaunchFailed { message, artifact } => {
            *failed = true;
            println!("{message}");
            println!("Install manually from {}", artifact.display());
        }
        UpdateEvent::ProgressDismissed { location } => {
            println!("Download continues; the file will land at {}", location.display());
        }
    }
}

fn choose(args: &CliArgs) -> Result<UpdateDecision, String> {
    if let Some(choice) = args.choice {
        return Ok(choice);
    }
    if !std::io::stdin().is_terminal() {
        return Ok(UpdateDecision::Dismiss);
    }
    println!("  [1] Download now");
    println!("  [2] Download in the background");
    println!("  [3] Not now");
    print!("Choice [1-3]: ");
    std::io::stdout().flush().map_err(|err| err.to_string())?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| err.to_string())?;
    Ok(match line.trim() {
        "1" => UpdateDecision::InteractiveFetch,
        "2" => UpdateDecision::BackgroundFetch,
        _ => UpdateDecision::Dismiss,
    })
}

fn prompt_yes_no(question: &str) -> bool {
    if !std::io::stdin().is_terminal() {
        return false;
    }
    print!("{question} [y/N]: ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}

fn parse_args(args: Vec<String>) -> Result<CliArgs, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Err(help_text());
    }
    let mut parsed = CliArgs {
        manual: false,
        repo: None,
        feed_base: None,
        download_dir: None,
        choice: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--manual" => {
                parsed.manual = true;
            }
            "--repo" => {
                parsed.repo = Some(next_value(&args, &mut i, "--repo")?);
            }
            "--feed" => {
                parsed.feed_base = Some(next_value(&args, &mut i, "--feed")?);
            }
            "--download-dir" => {
                parsed.download_dir =
                    Some(PathBuf::from(next_value(&args, &mut i, "--download-dir")?));
            }
            "--choice" => {
                let value = next_value(&args, &mut i, "--choice")?;
                parsed.choice = Some(match value.as_str() {
                    "download" => UpdateDecision::InteractiveFetch,
                    "background" => UpdateDecision::BackgroundFetch,
                    "dismiss" => UpdateDecision::Dismiss,
                    other => return Err(format!("Unknown choice '{other}'")),
                });
            }
            unknown => return Err(format!("Unknown argument '{unknown}'\n\n{}", help_text())),
        }
        i += 1;
    }
    Ok(parsed)
}

fn next_value(args: &[String], i: &mut usize, name: &str) -> Result<String, String> {
    let next = args
        .get(*i + 1)
        .ok_or_else(|| format!("Missing value for {name}"))?;
    *i += 1;
    Ok(next.clone())
}

fn help_text() -> String {
    format!(
        "Usage: {APP_NAME}-updater [options]\n\n\
Options:\n\
  --manual                     User-requested check; every outcome is shown\n\
  --repo <OWNER/REPO>          GitHub repository (default: configured slug)\n\
  --feed <URL>                 Release feed host (default: api.github.com)\n\
  --download-dir <dir>         Artifact directory (default: app downloads dir)\n\
  --choice <download|background|dismiss>\n\
                               Preselect the update decision (no prompt)\n\
  -h, --help                   Show help\n"
    )
}
