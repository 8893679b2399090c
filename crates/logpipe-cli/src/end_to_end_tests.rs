//! Exercises the whole wiring path — TOML document -> `Configuration` ->
//! compiled `Center` -> spawned `SourceRuntime`/`DestinationRuntime` ->
//! `MainLoop` — against real files, the same way
//! `logpipe-drivers-file::tail::tests::tails_lines_already_present_then_stops_at_exit`
//! exercises the driver alone.

use std::fs;
use std::io::Write;
use std::time::{Duration, Instant};

use crate::pipeline;

#[test]
fn tails_a_file_into_another_through_a_toml_document() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("in.log");
    let output_path = dir.path().join("out.log");

    {
        let mut f = fs::File::create(&input_path).unwrap();
        writeln!(f, "hello").unwrap();
        writeln!(f, "world").unwrap();
    }

    let cfg_path = dir.path().join("cfg.toml");
    fs::write(
        &cfg_path,
        format!(
            r#"
            [options]
            log_iw_size = 8
            flush_lines = 1
            mark_freq_secs = 1

            [[sources]]
            kind = "file-tail"
            name = "in"
            path = "{input}"
            poll_interval_ms = 5

            [[destinations]]
            kind = "file-append"
            name = "out"
            path = "{output}"

            [[connections]]
            sources = ["in"]
            destinations = ["out"]
            "#,
            input = input_path.display(),
            output = output_path.display(),
        ),
    )
    .unwrap();

    let mut loaded = pipeline::load_from_path(&cfg_path).unwrap();

    let deadline = Instant::now() + Duration::from_millis(500);
    while Instant::now() < deadline {
        loaded.main_loop.run_once();
        if fs::read_to_string(&output_path).map(|s| s.lines().count()).unwrap_or(0) >= 2 {
            break;
        }
    }

    loaded.main_loop.request_all_sources_exit();

    let written = fs::read_to_string(&output_path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, vec!["hello", "world"]);
}
