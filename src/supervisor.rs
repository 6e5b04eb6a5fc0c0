//! # Conversion Supervisor
//!
//! Runs one ffmpeg conversion and streams its progress.
//!
//! ## Command line:
//! ```text
//! ffmpeg -y -v error -stats [-ss <offset>] -i <source> <extra args...> <output>
//! ```
//! A `-ss <offset>` pair found among the extra args is moved in front of `-i`,
//! where ffmpeg seeks on the input instead of decoding up to the offset.
//!
//! ## Tasks:
//! ffmpeg blocks as soon as its stderr pipe is full, so waiting for exit and
//! reading stderr cannot happen one after the other. Each conversion spawns:
//! - **launcher**: spawns ffmpeg, emits `Started`, hands stderr to the drainer,
//!   waits for exit and reports the outcome
//! - **drainer**: tokenizes and normalizes stderr into `Progress` events until
//!   end of data, then emits `Finished` with the launcher's outcome
//!
//! The launcher drops its sender right after `Started`, so the drainer alone
//! closes the stream. There is no cancellation: a conversion ends when ffmpeg
//! exits.

use crate::config::{Config, TokenizerKind};
use crate::error::{ConversionFailure, Result};
use crate::events::{ConversionEvent, ConversionEvents};
use crate::media_file::MediaFile;
use crate::normalize::strip_spaces;
use crate::path_resolver::PathResolver;
use crate::tokenizer::Tokenizer;
use crate::tool_resolver::ToolResolver;
use crate::utils::to_os_string_vec;
use futures::StreamExt;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{ChildStderr, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

/// Input seek flag, only fast when it precedes `-i`
pub const SEEK_FLAG: &str = "-ss";

type Outcome = std::result::Result<(), ConversionFailure>;

/// Assemble the ffmpeg argument list
pub fn build_args(source: &Path, extra_args: &[String], output: &Path) -> Vec<OsString> {
    let mut extra: Vec<&str> = extra_args
        .iter()
        .map(String::as_str)
        .filter(|arg| !arg.trim().is_empty())
        .collect();

    let mut cmd_args = crate::args!["-y", "-v", "error", "-stats"];

    if let Some(pos) = extra.iter().position(|arg| *arg == SEEK_FLAG) {
        if pos + 1 < extra.len() {
            cmd_args.extend(to_os_string_vec(extra.drain(pos..pos + 2)));
        }
    }

    cmd_args.extend(crate::args!["-i", source]);
    cmd_args.extend(to_os_string_vec(extra));
    cmd_args.push(output.into());
    cmd_args
}

/// Starts ffmpeg conversions
#[derive(Debug, Clone)]
pub struct ConversionSupervisor {
    tools: ToolResolver,
    tokenizer: TokenizerKind,
    event_buffer: usize,
}

impl ConversionSupervisor {
    pub fn new(config: &Config) -> Self {
        Self {
            tools: ToolResolver::new(config),
            tokenizer: config.tokenizer,
            event_buffer: config.event_buffer.max(1),
        }
    }

    /// Convert `media` into `output_spec` and return the event stream.
    ///
    /// Only a missing ffmpeg is reported here. Anything that goes wrong once
    /// the stream exists arrives as its final `Finished(Err(..))` event.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn convert(
        &self,
        media: &MediaFile,
        output_spec: impl AsRef<Path>,
        extra_args: &[String],
    ) -> Result<ConversionEvents> {
        let ffmpeg = self.tools.ffmpeg()?;
        let output = PathResolver::resolve_output_path(media.path(), output_spec.as_ref());
        let args = build_args(media.path(), extra_args, &output);

        info!(
            "Converting {} -> {}",
            media.path().display(),
            output.display()
        );
        debug!("{} {:?}", ffmpeg.display(), args);

        let mut cmd = Command::new(&ffmpeg);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let (event_tx, event_rx) = mpsc::channel(self.event_buffer);
        let (stderr_tx, stderr_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(launch(cmd, event_tx.clone(), stderr_tx, outcome_tx));
        tokio::spawn(drain(
            stderr_rx,
            outcome_rx,
            Tokenizer::from(self.tokenizer),
            event_tx,
        ));

        Ok(ConversionEvents::new(event_rx))
    }
}

async fn launch(
    mut cmd: Command,
    events: mpsc::Sender<ConversionEvent>,
    stderr_tx: oneshot::Sender<ChildStderr>,
    outcome_tx: oneshot::Sender<Outcome>,
) {
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!("Error start ffmpeg: {}", e);
            let _ = outcome_tx.send(Err(ConversionFailure::SpawnFailed(e.to_string())));
            return;
        }
    };

    // Sent before the drainer gets the pipe, so it is always first
    if events.send(ConversionEvent::Started).await.is_err() {
        debug!("Event stream dropped before ffmpeg started");
    }
    drop(events);

    if let Some(stderr) = child.stderr.take() {
        let _ = stderr_tx.send(stderr);
    }

    let outcome = match child.wait().await {
        Ok(status) if status.success() => {
            debug!("ffmpeg finished: {}", status);
            Ok(())
        }
        Ok(status) => {
            error!("ffmpeg exited with {}", status);
            Err(ConversionFailure::ExitFailed(status.to_string()))
        }
        Err(e) => {
            error!("Error waiting for ffmpeg: {}", e);
            Err(ConversionFailure::WaitFailed(e.to_string()))
        }
    };
    let _ = outcome_tx.send(outcome);
}

async fn drain(
    stderr_rx: oneshot::Receiver<ChildStderr>,
    outcome_rx: oneshot::Receiver<Outcome>,
    tokenizer: Tokenizer,
    events: mpsc::Sender<ConversionEvent>,
) {
    // No pipe means the launcher never got ffmpeg running
    if let Ok(stderr) = stderr_rx.await {
        let mut tokens = FramedRead::new(stderr, tokenizer);
        let mut forwarding = true;

        while let Some(token) = tokens.next().await {
            let token = match token {
                Ok(token) => token,
                Err(e) => {
                    // Dropping the reader closes the pipe so ffmpeg cannot hang on it
                    warn!("Error reading ffmpeg output: {}", e);
                    break;
                }
            };
            if !forwarding {
                continue;
            }
            let line = strip_spaces(&token);
            if events.send(ConversionEvent::Progress(line)).await.is_err() {
                debug!("Event stream dropped, discarding remaining ffmpeg output");
                forwarding = false;
            }
        }
    }

    let outcome = outcome_rx.await.unwrap_or_else(|_| {
        Err(ConversionFailure::WaitFailed(
            "launcher stopped without an exit status".to_string(),
        ))
    });
    if events.send(ConversionEvent::Finished(outcome)).await.is_err() {
        debug!("Event stream dropped before ffmpeg finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WrapperError;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn extra(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_seek_moves_before_input() {
        let args = build_args(
            Path::new("/a/in.mp4"),
            &extra(&["-ss", "00:01:30", "-c:v", "libx264"]),
            Path::new("/a/out.mp4"),
        );
        assert_eq!(
            strings(&args),
            vec!["-y", "-v", "error", "-stats", "-ss", "00:01:30", "-i", "/a/in.mp4", "-c:v", "libx264", "/a/out.mp4"]
        );
    }

    #[test]
    fn test_seek_in_the_middle_of_extra_args() {
        let args = build_args(
            Path::new("/a/in.mp4"),
            &extra(&["-c:v", "libx264", "-ss", "10", "-crf", "20"]),
            Path::new("/a/out.mp4"),
        );
        assert_eq!(
            strings(&args),
            vec!["-y", "-v", "error", "-stats", "-ss", "10", "-i", "/a/in.mp4", "-c:v", "libx264", "-crf", "20", "/a/out.mp4"]
        );
    }

    #[test]
    fn test_without_seek_order_is_kept() {
        let args = build_args(
            Path::new("/a/in.mp4"),
            &extra(&["-vf", "scale=740:-1"]),
            Path::new("/a/out.mp4"),
        );
        assert_eq!(
            strings(&args),
            vec!["-y", "-v", "error", "-stats", "-i", "/a/in.mp4", "-vf", "scale=740:-1", "/a/out.mp4"]
        );
    }

    #[test]
    fn test_dangling_seek_and_blank_args() {
        let args = build_args(
            Path::new("/a/in.mp4"),
            &extra(&[" ", "", "-an", "-ss"]),
            Path::new("/a/out.mp4"),
        );
        assert_eq!(
            strings(&args),
            vec!["-y", "-v", "error", "-stats", "-i", "/a/in.mp4", "-an", "-ss", "/a/out.mp4"]
        );
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_reported_synchronously() {
        let temp_dir = TempDir::new().unwrap();
        let source = crate::test_support::source_file(temp_dir.path(), "in.mp4");
        let config = Config {
            ffmpeg_path: Some(PathBuf::from("/nowhere/ffmpeg")),
            ..Default::default()
        };

        let media = MediaFile::open(&source).unwrap();
        let err = ConversionSupervisor::new(&config)
            .convert(&media, "out.mp4", &[])
            .unwrap_err();
        assert!(matches!(err, WrapperError::ToolNotFound { ref tool } if tool == "ffmpeg"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_the_only_event() {
        let temp_dir = TempDir::new().unwrap();
        let source = crate::test_support::source_file(temp_dir.path(), "in.mp4");
        let ffmpeg = crate::test_support::not_executable(temp_dir.path(), "ffmpeg");
        let config = Config {
            ffmpeg_path: Some(ffmpeg),
            ..Default::default()
        };

        let media = MediaFile::open(&source).unwrap();
        let events = ConversionSupervisor::new(&config)
            .convert(&media, "out.mp4", &[])
            .unwrap();
        let events = tokio::time::timeout(Duration::from_secs(30), events.collect_all())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ConversionEvent::Finished(Err(ConversionFailure::SpawnFailed(_)))
        ));
    }

    #[cfg(unix)]
    mod with_fake_ffmpeg {
        use super::*;
        use crate::test_support::{fake_tool, source_file};

        struct Fixture {
            temp_dir: TempDir,
            media: MediaFile,
        }

        impl Fixture {
            fn new() -> Self {
                let temp_dir = TempDir::new().unwrap();
                let source = source_file(temp_dir.path(), "in.mp4");
                let media = MediaFile::open(&source).unwrap();
                Self { temp_dir, media }
            }

            fn path(&self, name: &str) -> PathBuf {
                self.temp_dir.path().join(name)
            }

            fn supervisor(&self, script: &str, tweak: impl FnOnce(&mut Config)) -> ConversionSupervisor {
                let mut config = Config {
                    ffmpeg_path: Some(fake_tool(self.temp_dir.path(), "ffmpeg", script)),
                    ..Default::default()
                };
                tweak(&mut config);
                ConversionSupervisor::new(&config)
            }
        }

        async fn run(events: ConversionEvents) -> Vec<ConversionEvent> {
            tokio::time::timeout(Duration::from_secs(60), events.collect_all())
                .await
                .expect("event stream never closed")
        }

        fn progress(line: &str) -> ConversionEvent {
            ConversionEvent::Progress(line.to_string())
        }

        #[tokio::test]
        async fn test_events_in_order_then_closed() {
            let fixture = Fixture::new();
            let args_log = fixture.path("args.txt");
            let script = format!(
                "echo \"$@\" > '{}'\n\
                 printf 'frame=    1  fps=0.0 q=0.0\\r' >&2\n\
                 printf 'frame=    2  fps=0.0 q=0.0\\r' >&2\n\
                 printf 'video:1kB audio:0kB\\n' >&2\n",
                args_log.display()
            );
            let supervisor = fixture.supervisor(&script, |_| {});

            let events = supervisor
                .convert(&fixture.media, "out.mkv", &extra(&["-c:v", "copy", "-ss", "5"]))
                .unwrap();
            let events = run(events).await;

            assert_eq!(events[0].to_string(), "Converting started");
            assert_eq!(
                events,
                vec![
                    ConversionEvent::Started,
                    progress("frame=1 fps=0.0 q=0.0"),
                    progress("frame=2 fps=0.0 q=0.0"),
                    progress("video:1kB audio:0kB"),
                    ConversionEvent::Finished(Ok(())),
                ]
            );

            let args = std::fs::read_to_string(&args_log).unwrap();
            assert_eq!(
                args.trim(),
                format!(
                    "-y -v error -stats -ss 5 -i {} -c:v copy {}",
                    fixture.media.path().display(),
                    fixture.path("out.mkv").display()
                )
            );
        }

        #[tokio::test]
        async fn test_exit_failure_is_last_event() {
            let fixture = Fixture::new();
            let supervisor = fixture.supervisor("echo 'Unknown encoder x266' >&2\nexit 3\n", |_| {});

            let events = run(supervisor.convert(&fixture.media, "out.mp4", &[]).unwrap()).await;

            assert_eq!(events.first(), Some(&ConversionEvent::Started));
            assert_eq!(events[1], progress("Unknown encoder x266"));
            assert_eq!(events.len(), 3);
            match events.last().and_then(ConversionEvent::failure) {
                Some(ConversionFailure::ExitFailed(status)) => assert!(status.contains('3')),
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        const NOISY: &str = "i=0\n\
            while [ $i -lt 20000 ]; do\n\
            echo \"frame=  $i fps= 25.0 q=28.0 size=    1024kB time=00:00:01.00\" >&2\n\
            i=$((i+1))\n\
            done\n";

        #[tokio::test]
        async fn test_large_output_drains_to_completion() {
            let fixture = Fixture::new();
            let supervisor = fixture.supervisor(NOISY, |config| config.event_buffer = 4);

            let events = run(supervisor.convert(&fixture.media, "out.mp4", &[]).unwrap()).await;

            assert_eq!(events.len(), 20_000 + 2);
            assert_eq!(events[1], progress("frame=0 fps=25.0 q=28.0 size=1024kB time=00:00:01.00"));
            assert_eq!(events.last(), Some(&ConversionEvent::Finished(Ok(()))));
        }

        #[tokio::test]
        async fn test_dropped_stream_does_not_block_ffmpeg() {
            let fixture = Fixture::new();
            let marker = fixture.path("done");
            let script = format!("{}touch '{}'\n", NOISY, marker.display());
            let supervisor = fixture.supervisor(&script, |config| config.event_buffer = 1);

            let mut events = supervisor.convert(&fixture.media, "out.mp4", &[]).unwrap();
            assert_eq!(events.recv().await, Some(ConversionEvent::Started));
            drop(events);

            tokio::time::timeout(Duration::from_secs(60), async {
                while !marker.exists() {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
            .await
            .expect("ffmpeg stayed blocked on its stderr pipe");
        }

        #[tokio::test]
        async fn test_legacy_stats_tokenizer() {
            let fixture = Fixture::new();
            let script = "printf 'frame=   24 fps=0.0 q=28.0 size=       0kB time=00:00:01.00 bitrate=   0.4kbits/s speed=1.9x    \\r' >&2\n\
                          printf 'frame=   48 fps= 47 q=28.0 size=     256kB time=00:00:02.00 bitrate=1048.6kbits/s speed=1.95x    \\r' >&2\n";
            let supervisor = fixture.supervisor(script, |config| {
                config.tokenizer = TokenizerKind::StatsWords;
            });

            let events = run(supervisor.convert(&fixture.media, "out.mp4", &[]).unwrap()).await;

            assert_eq!(
                events,
                vec![
                    ConversionEvent::Started,
                    progress("frame=24 fps=0.0 q=28.0 size=0kB time=00:00:01.00 bitrate=0.4kbits/s speed=1.9x"),
                    progress("frame=48 fps=47 q=28.0 size=256kB time=00:00:02.00 bitrate=1048.6kbits/s speed=1.95x"),
                    ConversionEvent::Finished(Ok(())),
                ]
            );
        }
    }
}
