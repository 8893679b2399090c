//! A thin binary wiring a TOML configuration file to `logpipe-core`,
//! `logpipe-runtime-std` and `logpipe-drivers-file` — enough to run the
//! system end to end. No general configuration language or macro system,
//! no service manager: just the minimum wiring needed to start a pipeline
//! and, optionally, hot-reload it.

mod build;
mod cfg_file;
mod config_handle;
mod error;
mod pipeline;

#[cfg(test)]
mod end_to_end_tests;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use config_handle::ConfigHandle;
use error::CliError;

struct Args {
    config_path: PathBuf,
    reload_poll: Option<Duration>,
}

fn usage(msg: &str) -> String {
    format!(
        "{msg}\n\nusage: logpipe <config.toml> [--reload-poll-secs N]\n\n  --reload-poll-secs N   re-read the config file every N seconds and,\n                         if its mtime changed, swap in a freshly compiled\n                         pipeline (default: reload disabled)"
    )
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let config_path = raw.next().ok_or_else(|| usage("missing required <config.toml> argument"))?;
    let mut reload_poll = None;

    while let Some(flag) = raw.next() {
        match flag.as_str() {
            "--reload-poll-secs" => {
                let value = raw.next().ok_or_else(|| usage("--reload-poll-secs requires a value"))?;
                let secs: u64 = value.parse().map_err(|_| usage("--reload-poll-secs expects an integer"))?;
                reload_poll = (secs > 0).then(|| Duration::from_secs(secs));
            }
            other => return Err(usage(&format!("unrecognized flag '{other}'"))),
        }
    }

    Ok(Args { config_path: PathBuf::from(config_path), reload_poll })
}

fn file_mtime(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn run(args: Args) -> Result<(), CliError> {
    let loaded = pipeline::load_from_path(&args.config_path)?;
    let handle = ConfigHandle::new(loaded.center);
    let mut main_loop = loaded.main_loop;

    tracing::info!(path = %args.config_path.display(), "pipeline started");

    let mut last_reload_check = Instant::now();
    let mut last_mtime = file_mtime(&args.config_path);

    loop {
        main_loop.run_once();

        let Some(poll_interval) = args.reload_poll else { continue };
        if last_reload_check.elapsed() < poll_interval {
            continue;
        }
        last_reload_check = Instant::now();

        let mtime = file_mtime(&args.config_path);
        if mtime.is_none() || mtime == last_mtime {
            continue;
        }
        last_mtime = mtime;

        match pipeline::load_from_path(&args.config_path) {
            Ok(reloaded) => {
                tracing::info!("configuration changed, reloading pipeline");
                main_loop.request_all_sources_exit();
                let previous = handle.publish(reloaded.center);
                previous.deinit();
                main_loop = reloaded.main_loop;
            }
            Err(err) => {
                tracing::error!(error = %err, "reload failed, keeping the previously active pipeline");
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("logpipe: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> impl Iterator<Item = String> {
        words.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn config_path_is_the_only_required_argument() {
        let parsed = parse_args(args(&["cfg.toml"])).unwrap();
        assert_eq!(parsed.config_path, PathBuf::from("cfg.toml"));
        assert_eq!(parsed.reload_poll, None);
    }

    #[test]
    fn reload_poll_secs_is_parsed_and_zero_disables_it() {
        let parsed = parse_args(args(&["cfg.toml", "--reload-poll-secs", "30"])).unwrap();
        assert_eq!(parsed.reload_poll, Some(Duration::from_secs(30)));

        let parsed = parse_args(args(&["cfg.toml", "--reload-poll-secs", "0"])).unwrap();
        assert_eq!(parsed.reload_poll, None);
    }

    #[test]
    fn missing_config_path_is_an_error() {
        assert!(parse_args(args(&[])).is_err());
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse_args(args(&["cfg.toml", "--bogus"])).is_err());
    }
}
