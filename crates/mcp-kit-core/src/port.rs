//! Detect, free, and search for TCP ports on the local host.
//!
//! `lsof` is shelled out to rather than reimplemented: enumerating socket
//! owners portably from inside the process is a much larger undertaking than
//! parsing a few lines of `lsof` output, and every host this runs on ships
//! it. Termination uses a raw `kill(2)` call the same way the source
//! codebase's team-cleanup path does, rather than pulling in a process
//! control crate for two syscalls.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::sleep;
use tracing::warn;

use crate::error::CoreError;

/// Grace period between the polite and forceful termination signals.
const TERMINATE_GRACE: Duration = Duration::from_millis(300);

/// `true` iff something is listening on `port` on this host.
///
/// Port 0 is kernel-assigned and always reported as not in use. `lsof`
/// output is parsed leniently: any non-empty stdout is treated as "in use";
/// empty/whitespace-only output or a "no matches" exit status both mean
/// free. Any other spawn failure (e.g. `lsof` not installed) is also
/// treated as "not in use" — the caller cannot act on it.
pub async fn is_port_in_use(port: u16) -> bool {
    if port == 0 {
        return false;
    }
    match Command::new("lsof")
        .arg(format!("-i:{port}"))
        .output()
        .await
    {
        Ok(output) => !output.stdout.is_empty() && !is_blank(&output.stdout),
        Err(_) => false,
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes)
        .map(|s| s.trim().is_empty())
        .unwrap_or(false)
}

/// Parse PIDs out of `lsof -i:<port>` output. The first line is a header;
/// subsequent lines are whitespace-separated with PID in the second column.
/// Unrecognized lines are skipped rather than treated as fatal.
fn parse_pids(output: &str) -> Vec<u32> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|field| field.parse::<u32>().ok())
        .collect()
}

/// Enumerate PIDs holding `port` and terminate them: SIGTERM first, then a
/// brief grace period, then SIGKILL if still alive. Returns `true` iff at
/// least one PID was observed, regardless of whether termination succeeded.
/// Per-PID failures are logged and do not abort the pass.
pub async fn kill_port_holders(port: u16) -> bool {
    let output = match Command::new("lsof").arg(format!("-i:{port}")).output().await {
        Ok(output) => output,
        Err(e) => {
            warn!(port, error = %e, "failed to spawn lsof");
            return false;
        }
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    let pids = parse_pids(&stdout);
    if pids.is_empty() {
        return false;
    }
    for pid in pids {
        terminate(pid).await;
    }
    true
}

async fn terminate(pid: u32) {
    #[cfg(unix)]
    {
        // SAFETY: pid came from lsof output; SIGTERM/SIGKILL are well-defined.
        let _ = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        sleep(TERMINATE_GRACE).await;
        if crate::lock::is_pid_alive(pid as i64) {
            let _ = unsafe { libc::kill(pid as i32, libc::SIGKILL) };
        }
    }
    #[cfg(not(unix))]
    {
        warn!(pid, "process termination is not supported on this platform");
    }
}

/// Probe `start, start + 1, …` for the first free port, bounded by
/// `max_retries` attempts. `start` itself counts as attempt zero.
pub async fn find_available_port(start: u16, max_retries: u32) -> Result<u16, CoreError> {
    let mut candidate = start;
    for attempt in 0..=max_retries {
        if !is_port_in_use(candidate).await {
            return Ok(candidate);
        }
        if attempt == max_retries {
            break;
        }
        candidate = candidate.checked_add(1).ok_or(CoreError::NoFreePort {
            start,
            max_retries,
        })?;
    }
    Err(CoreError::NoFreePort { start, max_retries })
}

/// Ensure `port` is free. If already free, returns `true` with no side
/// effects. If occupied and `may_kill` is `true`, attempts to kill holders
/// and re-probes. If occupied and `may_kill` is `false`, returns `false`
/// without side effects.
pub async fn ensure_port_available(port: u16, may_kill: bool) -> bool {
    if !is_port_in_use(port).await {
        return true;
    }
    if !may_kill {
        return false;
    }
    kill_port_holders(port).await;
    !is_port_in_use(port).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pids_skips_header_and_unrecognized_lines() {
        let output = "COMMAND   PID   USER   FD   TYPE\nnode    12345   root   23u  IPv4\ngarbage line\nnode    999    root   24u  IPv4";
        let pids = parse_pids(output);
        assert_eq!(pids, vec![12345, 999]);
    }

    #[test]
    fn parse_pids_empty_for_header_only() {
        let output = "COMMAND   PID   USER   FD   TYPE";
        assert!(parse_pids(output).is_empty());
    }

    #[tokio::test]
    async fn port_zero_is_never_in_use() {
        assert!(!is_port_in_use(0).await);
    }

    #[tokio::test]
    async fn find_available_port_returns_start_when_free() {
        // A high, unprivileged, essentially-never-bound port in CI sandboxes.
        let port = find_available_port(41_000, 10).await.unwrap();
        assert!(port >= 41_000);
    }

    #[tokio::test]
    async fn ensure_port_available_true_for_free_port_without_kill() {
        assert!(ensure_port_available(41_001, false).await);
    }
}
