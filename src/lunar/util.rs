use anyhow::Result;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

#[derive(Debug)]
pub enum CommandOutcome {
    Finished(Output),
    TimedOut,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_until(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Run `cmd` with `input` on stdin, killing it once `timeout` elapses.
/// Output pipes are drained on their own threads so a chatty child never blocks.
pub fn run_with_input(cmd: &mut Command, input: &[u8], timeout: Duration) -> io::Result<CommandOutcome> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    if let Some(mut stdin) = child.stdin.take() {
        let payload = input.to_vec();
        thread::spawn(move || {
            let _ = stdin.write_all(&payload);
        });
    }

    let Some(status) = wait_until(&mut child, timeout)? else {
        return Ok(CommandOutcome::TimedOut);
    };
    Ok(CommandOutcome::Finished(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn captures_output_of_command_reading_stdin() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("cat; echo done >&2");
        let outcome =
            run_with_input(&mut cmd, b"[1,2,3]", Duration::from_secs(5)).expect("command runs");
        let CommandOutcome::Finished(output) = outcome else {
            panic!("command timed out");
        };
        assert!(output.status.success());
        assert_eq!(output.stdout, b"[1,2,3]");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "done");
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_is_killed_at_timeout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5");
        let outcome =
            run_with_input(&mut cmd, b"", Duration::from_millis(200)).expect("command runs");
        assert!(matches!(outcome, CommandOutcome::TimedOut));
    }

    #[test]
    fn epoch_is_after_2020() {
        assert!(now_epoch_secs().expect("clock") > 1_577_836_800);
    }
}
