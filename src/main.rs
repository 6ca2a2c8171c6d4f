use clap::{Parser, Subcommand};
use postsmith::pipeline::{self, Project};
use postsmith::watch::{Changes, WatchError, Watcher};
use postsmith::{config, output};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "postsmith")]
#[command(about = "Markdown blog generator for hand-written HTML sites")]
#[command(long_about = "\
Markdown blog generator for hand-written HTML sites

Posts are markdown files with a small frontmatter block. Each one becomes an
HTML page built from a post template, and a listing page shows every post as
a tile, newest first.

Project structure:

  project/
  ├── config.toml                  # Optional, see 'postsmith gen-config'
  ├── posts/
  │   ├── 2026-02-01-hello.md      # Post (filename stem is the slug)
  │   └── img/                     # Post assets → public/blog-files/img/
  ├── src/components/footer.html   # <!-- component:footer -->
  └── src/templates/
      ├── post.html                # {{ title }} {{ date_display }} {{ toc }} {{ content }}
      └── blog.html                # {{ post_tiles }}

Frontmatter:

  ---
  title: \"Hello\"
  date: 2026-02-01
  summary: \"A test\"
  ---

Every template and component may use {{ root }} and {{ year }}.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: <root>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every post and the listing page
    Build,
    /// Build, then rebuild whenever a source file changes
    Watch {
        /// Poll interval or quiet period in milliseconds (overrides [watch] interval_ms)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
    },
    /// Parse every post without writing anything
    Check {
        /// Print post summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let load = || Project::load(&cli.root, cli.config.as_deref());

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Build => {
            let project = load()?;
            println!("==> Building {}", project.root.display());
            let report = pipeline::build(&project)?;
            output::print_build_report(&report);
            println!("==> Build complete");
        }
        Command::Watch { interval_ms } => {
            let project = load()?;
            let interval =
                Duration::from_millis(interval_ms.unwrap_or(project.config.watch.interval_ms));
            watch(project, interval)?;
        }
        Command::Check { json } => {
            let project = load()?;
            let report = pipeline::check(&project)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.summaries)?);
            } else {
                println!("==> Checking {}", project.root.display());
                output::print_check_report(&report);
            }
            if !report.is_ok() {
                eprintln!("{} post(s) could not be parsed", report.skipped.len());
                return Ok(ExitCode::FAILURE);
            }
            if !json {
                println!("==> Posts are valid");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn watch(mut project: Project, interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_signal = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_for_signal.store(true, Ordering::SeqCst);
    })
    .map_err(WatchError::from)?;

    println!("==> Watching {} (Ctrl+C to stop)", project.root.display());
    let mut watcher = Watcher::start(project.watch_paths(), interval, || {
        rebuild(&project);
    })?;
    if project.config.watch.native
        && let Err(err) = watcher.watch_natively()
    {
        eprintln!("warning: {err}");
    }
    if watcher.is_native() {
        println!("==> Using file notifications ({} ms quiet period)", interval.as_millis());
    } else {
        println!("==> Polling every {} ms", interval.as_millis());
    }

    let root = project.root.clone();
    let config_path = project.config_path.clone();
    watcher.run(
        &stop,
        |changes| {
            println!("==> Changes detected");
            output::print_changes(changes, &root);
            if touches(changes, &config_path) {
                match Project::load(&root, Some(config_path.as_path())) {
                    Ok(reloaded) => project = reloaded,
                    Err(err) => {
                        eprintln!("error: {err}");
                        return;
                    }
                }
            }
            rebuild(&project);
        },
        |err| eprintln!("error: {err}"),
    );

    println!("==> Stopped");
    Ok(())
}

/// Build once, reporting failure without exiting.
fn rebuild(project: &Project) {
    println!("==> Building {}", project.root.display());
    match pipeline::build(project) {
        Ok(report) => {
            output::print_build_report(&report);
            println!("==> Build complete");
        }
        Err(err) => eprintln!("error: {err}"),
    }
}

fn touches(changes: &Changes, path: &Path) -> bool {
    changes
        .added
        .iter()
        .chain(&changes.modified)
        .chain(&changes.removed)
        .any(|p| p == path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_flag_overrides_config() {
        let cli = Cli::try_parse_from(["postsmith", "watch", "--interval-ms", "250"]).unwrap();
        assert!(matches!(cli.command, Command::Watch { interval_ms: Some(250) }));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["postsmith", "watch", "--interval-ms", "0"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["postsmith", "check", "--json", "--root", "site"]).unwrap();
        assert_eq!(cli.root, PathBuf::from("site"));
        assert!(matches!(cli.command, Command::Check { json: true }));
    }
}
