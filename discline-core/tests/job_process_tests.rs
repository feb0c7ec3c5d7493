//! End-to-end read jobs against a scripted stand-in for `readcd`.
//!
//! The stand-in takes its behaviour from files in a scenario directory that
//! is passed as a user parameter: `stderr.txt` is replayed on stderr,
//! `stdout.txt` on stdout, `crash` makes it kill itself, `sleep` keeps it
//! running and `exit_code` sets its exit status. It also records its
//! arguments in `args.txt`.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use discline_core::events::RecordingHandler;
use discline_core::external::{ExternalBin, FEATURE_CLONE, ToolVersion};
use discline_core::{
    CoreConfig, FailureReason, ImageDestination, JobController, JobEvent, JobState, MsfTime,
    ReadParams, SectorRange, Severity, ToolRegistry,
};
use tempfile::TempDir;

const FAKE_READCD: &str = r#"#!/bin/sh
dir=""
for arg in "$@"; do
    case "$arg" in
        scenario=*) dir="${arg#scenario=}" ;;
    esac
done
echo "$@" > "$dir/args.txt"
if [ -f "$dir/stdout.txt" ]; then cat "$dir/stdout.txt"; fi
if [ -f "$dir/stderr.txt" ]; then cat "$dir/stderr.txt" >&2; fi
if [ -f "$dir/crash" ]; then kill -KILL $$; fi
if [ -f "$dir/sleep" ]; then exec sleep "$(cat "$dir/sleep")"; fi
if [ -f "$dir/exit_code" ]; then exit "$(cat "$dir/exit_code")"; fi
exit 0
"#;

fn fake_readcd() -> &'static Path {
    static SCRIPT: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = SCRIPT.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readcd");
        fs::write(&path, FAKE_READCD).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    });
    path
}

struct Scenario {
    dir: TempDir,
}

impl Scenario {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn with_file(self, name: &str, content: &str) -> Self {
        fs::write(self.dir.path().join(name), content).unwrap();
        self
    }

    fn stderr(self, lines: &[&str]) -> Self {
        let mut text = lines.join("\n");
        text.push('\n');
        self.with_file("stderr.txt", &text)
    }

    fn image_path(&self) -> PathBuf {
        self.dir.path().join("disc.iso")
    }

    fn params(&self) -> ReadParams {
        ReadParams::new("/dev/sr0", ImageDestination::Path(self.image_path()))
    }

    fn bin(&self) -> ExternalBin {
        ExternalBin::new("readcd", fake_readcd())
            .with_version(ToolVersion::new(3, 2))
            .with_user_parameters([format!("scenario={}", self.dir.path().display())])
    }

    fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.add(self.bin());
        registry
    }

    fn args(&self) -> String {
        fs::read_to_string(self.dir.path().join("args.txt")).unwrap()
    }
}

fn run_with(
    registry: ToolRegistry,
    params: ReadParams,
    config: CoreConfig,
) -> (JobController, Arc<RecordingHandler>) {
    let recorder = Arc::new(RecordingHandler::new());
    let mut job = JobController::new(params, config, Arc::new(registry));
    job.add_handler(recorder.clone());
    job.start().unwrap();
    (job, recorder)
}

fn run(scenario: &Scenario) -> (JobController, Arc<RecordingHandler>) {
    let (mut job, recorder) = run_with(scenario.registry(), scenario.params(), CoreConfig::default());
    job.wait();
    (job, recorder)
}

fn percents(events: &[JobEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Percent { value } => Some(*value),
            _ => None,
        })
        .collect()
}

fn count(events: &[JobEvent], wanted: &JobEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

#[test]
fn test_successful_read() {
    let scenario = Scenario::new().stderr(&[
        "end:  1000",
        "addr:  250cnt: 64",
        "addr:  500cnt: 64",
        "Retrying from sector 510.",
        "Error on sector 512 corrected.",
        "addr:  1000cnt: 64",
    ]);
    let (job, recorder) = run(&scenario);

    assert_eq!(job.state(), JobState::Finished);
    assert_eq!(job.unreadable_blocks(), 1);

    let events = recorder.normalized();
    assert_eq!(events.first(), Some(&JobEvent::Started));
    assert_eq!(events.last(), Some(&JobEvent::Finished { success: true }));
    assert_eq!(count(&events, &JobEvent::Finished { success: true }), 1);
    assert_eq!(count(&events, &JobEvent::Canceled), 0);
    assert_eq!(percents(&events), vec![25, 50, 100]);
    assert!(events.contains(&JobEvent::ProcessedSize {
        current_kib: 2000,
        total_kib: 2000
    }));
    assert!(events.contains(&JobEvent::info("Retrying from sector 510.", Severity::Info)));
    assert!(events.contains(&JobEvent::info("Corrected error in sector 512", Severity::Error)));
    assert!(events.contains(&JobEvent::info(
        "1 unreadable blocks reported.",
        Severity::Warning
    )));
    assert!(events.contains(&JobEvent::NewTask {
        description: format!("Writing image to {}.", scenario.image_path().display())
    }));

    let args = scenario.args();
    assert!(args.starts_with("-v dev=/dev/sr0 f="));
    assert!(args.contains(" retries=128 ts=128k scenario="));
}

#[test]
fn test_raw_output_is_forwarded_in_order() {
    let lines: Vec<String> = (1..=50).map(|i| format!("addr:  {}cnt: 64", i * 10)).collect();
    let mut stderr = vec!["end: 500".to_string()];
    stderr.extend(lines);
    let refs: Vec<&str> = stderr.iter().map(String::as_str).collect();
    let scenario = Scenario::new().stderr(&refs);
    let (_, recorder) = run(&scenario);

    let raw: Vec<String> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            JobEvent::DebuggingOutput { tag, line } if tag == "readcd" => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(raw, stderr);

    let percents = percents(&recorder.normalized());
    assert_eq!(percents.len(), 50);
    assert!(percents.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_carriage_return_progress() {
    let scenario = Scenario::new().with_file(
        "stderr.txt",
        "end:  12345\naddr:  3000cnt: 64\raddr:  6000cnt: 64\raddr:  6000cnt: 64\r\n",
    );
    let (_, recorder) = run(&scenario);
    assert_eq!(percents(&recorder.normalized()), vec![24, 48]);
}

#[test]
fn test_nonzero_exit() {
    let scenario = Scenario::new()
        .stderr(&["Cannot read source disk"])
        .with_file("exit_code", "3");
    let (job, recorder) = run(&scenario);

    assert_eq!(job.state(), JobState::Failed(FailureReason::NonZeroExit(3)));
    let events = recorder.normalized();
    assert!(events.contains(&JobEvent::info("Cannot read source disk.", Severity::Error)));
    assert!(events.contains(&JobEvent::info("Readcd returned error: 3", Severity::Error)));
    assert_eq!(events.last(), Some(&JobEvent::Finished { success: false }));
    assert_eq!(count(&events, &JobEvent::Canceled), 0);
}

#[test]
fn test_abnormal_exit_is_not_a_cancel() {
    let scenario = Scenario::new()
        .stderr(&["end: 100", "addr: 10cnt: 64"])
        .with_file("crash", "");
    let (job, recorder) = run(&scenario);

    assert!(matches!(
        job.state(),
        JobState::Failed(FailureReason::AbnormalExit(_))
    ));
    let events = recorder.normalized();
    assert!(events.contains(&JobEvent::info("Readcd exited abnormally.", Severity::Error)));
    assert_eq!(count(&events, &JobEvent::Canceled), 0);
    assert_eq!(events.last(), Some(&JobEvent::Finished { success: false }));
}

#[test]
fn test_cancel_running_job() {
    let scenario = Scenario::new()
        .stderr(&["end: 1000", "addr: 100cnt: 64"])
        .with_file("sleep", "30");
    let (mut job, recorder) = run_with(scenario.registry(), scenario.params(), CoreConfig::default());
    assert_eq!(job.state(), JobState::Running);

    let handle = job.cancel_handle();
    let canceler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        let first = handle.cancel();
        let second = handle.cancel();
        (first, second)
    });

    let outcome = job.wait();
    let (first, second) = canceler.join().unwrap();
    assert!(first);
    assert!(!second);
    assert_eq!(outcome.state, JobState::Canceled);

    let events = recorder.normalized();
    assert_eq!(count(&events, &JobEvent::Canceled), 1);
    assert_eq!(count(&events, &JobEvent::Finished { success: true }), 0);
    let tail = &events[events.len() - 2..];
    assert_eq!(tail, [JobEvent::Canceled, JobEvent::Finished { success: false }]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, JobEvent::InfoMessage { text, .. } if text.contains("abnormally"))));
}

#[test]
fn test_cancel_after_exit_is_ignored() {
    let scenario = Scenario::new();
    let (job, recorder) = run(&scenario);
    assert!(!job.cancel());
    assert!(!job.cancel_handle().cancel());
    assert_eq!(job.state(), JobState::Finished);
    assert_eq!(count(&recorder.events(), &JobEvent::Canceled), 0);
}

#[test]
fn test_watchdog_terminates_stuck_tool() {
    let scenario = Scenario::new().with_file("sleep", "30");
    let config = CoreConfig {
        watchdog_secs: Some(1),
        ..CoreConfig::default()
    };
    let (mut job, recorder) = run_with(scenario.registry(), scenario.params(), config);
    let outcome = job.wait();

    assert_eq!(
        outcome.state,
        JobState::Failed(FailureReason::TimedOut(Duration::from_secs(1)))
    );
    let events = recorder.normalized();
    assert!(events.contains(&JobEvent::info(
        "Readcd did not finish within 1s and was terminated.",
        Severity::Error
    )));
    assert_eq!(count(&events, &JobEvent::Canceled), 0);
    assert_eq!(events.last(), Some(&JobEvent::Finished { success: false }));
}

#[test]
fn test_sector_range_progress_is_relative() {
    let scenario = Scenario::new().stderr(&["end: 1100", "addr: 600cnt: 64"]);
    let params = ReadParams {
        sector_range: Some(
            SectorRange::inclusive(MsfTime::from_lba(100), MsfTime::from_lba(1099)).unwrap(),
        ),
        ..scenario.params()
    };
    let (mut job, recorder) = run_with(scenario.registry(), params, CoreConfig::default());
    job.wait();

    assert!(scenario.args().contains(" sectors=100-1100 "));
    let events = recorder.normalized();
    assert_eq!(percents(&events), vec![50]);
    assert!(events.contains(&JobEvent::ProcessedSize {
        current_kib: 1000,
        total_kib: 2000
    }));
}

#[test]
fn test_clone_read_uses_capable_installation() {
    let scenario = Scenario::new();
    let mut registry = ToolRegistry::new();
    registry.add(ExternalBin::new("readcd", "/nonexistent/discline/readcd").with_version(ToolVersion::new(1, 1)));
    registry.add(
        scenario
            .bin()
            .with_version("3.02a09".parse().unwrap())
            .with_feature(FEATURE_CLONE),
    );
    let params = ReadParams {
        clone: true,
        no_correction: true,
        ..scenario.params()
    };
    let (mut job, recorder) = run_with(registry, params, CoreConfig::default());
    assert_eq!(job.wait().state, JobState::Finished);

    assert!(recorder.events().contains(&JobEvent::info(
        "Using readcd 3.02a09 instead of default version for clone support.",
        Severity::Info
    )));
    assert!(scenario.args().contains(" -clone -nocorr "));
}

#[test]
fn test_pipe_destination_receives_image_data() {
    let scenario = Scenario::new().with_file("stdout.txt", "IMAGEDATA");
    let piped = scenario.dir.path().join("piped.iso");
    let file = fs::File::create(&piped).unwrap();
    let params = ReadParams::new("/dev/sr0", ImageDestination::Pipe(file));

    let (mut job, recorder) = run_with(scenario.registry(), params, CoreConfig::default());
    assert_eq!(job.wait().state, JobState::Finished);

    assert_eq!(fs::read_to_string(&piped).unwrap(), "IMAGEDATA");
    assert!(scenario.args().contains(" f=- "));
    assert!(!recorder
        .events()
        .iter()
        .any(|e| matches!(e, JobEvent::DebuggingOutput { line, .. } if line.contains("IMAGEDATA"))));
}
