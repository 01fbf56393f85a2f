// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! query and control a service through the systemctl executable
//!

use crate::cancel::CancelToken;
use crate::config::ReconcileConfig;
use crate::error::*;
use crate::interface::{ControlStatus, ServiceControl, ServiceQuery};
use crate::unit::ActionKind;
use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// the longest time a child is waited for without looking at the cancel
/// token
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Both collaborators on top of `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemCtl {
    path: String,
    query_timeout: Duration,
}

/// how waiting for a child ended
enum Waited {
    Exited(ExitStatus),
    /* the child was killed */
    TimedOut,
}

/// Reads a child pipe to the end on its own thread, a child writing more
/// than the pipe buffer never blocks on us.
struct PipeReader {
    handle: Option<JoinHandle<std::io::Result<String>>>,
}

impl PipeReader {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let handle = pipe.map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf)?;
                Ok(String::from_utf8_lossy(&buf).into_owned())
            })
        });
        PipeReader { handle }
    }

    /// only call once the child has exited, the pipe is closed by then
    fn collect(self) -> std::io::Result<String> {
        match self.handle {
            None => Ok(String::new()),
            Some(handle) => match handle.join() {
                Ok(ret) => ret,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "pipe reader panicked",
                )),
            },
        }
    }
}

impl SystemCtl {
    ///
    pub fn new(path: &str, query_timeout: Duration) -> Self {
        SystemCtl {
            path: path.to_string(),
            query_timeout,
        }
    }

    ///
    pub fn from_config(config: &ReconcileConfig) -> Self {
        SystemCtl::new(&config.SystemctlPath, config.query_timeout())
    }

    /// Run `systemctl <verb> <name>` and return its trimmed stdout. The exit
    /// code is not looked at, is-active and is-enabled exit non-zero for
    /// every answer but the positive one.
    fn query(&self, verb: &str, name: &str, budget: Duration, cancel: &CancelToken) -> Result<String> {
        let cmd = format!("{} {} {}", self.path, verb, name);
        let timeout = self.query_timeout.min(budget);
        let mut child = match Command::new(&self.path)
            .arg(verb)
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(v) => v,
            Err(e) => {
                return QueryUnavailableSnafu {
                    name,
                    msg: format!("failed to spawn '{}': {}", cmd, e),
                }
                .fail()
            }
        };
        let stdout = PipeReader::spawn::<ChildStdout>(child.stdout.take());

        match wait_child(&mut child, &cmd, name, timeout, cancel) {
            Ok(Waited::Exited(status)) => {
                log::debug!("'{}' exited with status {:?}", cmd, status)
            }
            Ok(Waited::TimedOut) => {
                return QueryUnavailableSnafu {
                    name,
                    msg: format!("'{}' did not answer within {:?}", cmd, timeout),
                }
                .fail();
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                return QueryUnavailableSnafu {
                    name,
                    msg: format!("failed to wait for '{}': {}", cmd, e),
                }
                .fail();
            }
        }

        match stdout.collect() {
            Ok(v) => Ok(v.trim().to_string()),
            Err(e) => QueryUnavailableSnafu {
                name,
                msg: format!("failed to read output of '{}': {}", cmd, e),
            }
            .fail(),
        }
    }
}

impl ServiceQuery for SystemCtl {
    fn is_active(&self, name: &str, budget: Duration, cancel: &CancelToken) -> Result<bool> {
        Ok(self.query("is-active", name, budget, cancel)? == "active")
    }

    fn is_enabled(&self, name: &str, budget: Duration, cancel: &CancelToken) -> Result<bool> {
        Ok(self.query("is-enabled", name, budget, cancel)? == "enabled")
    }
}

impl ServiceControl for SystemCtl {
    fn run(
        &self,
        kind: ActionKind,
        name: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<ControlStatus> {
        let cmd = format!("{} {} {}", self.path, kind.verb(), name);
        let mut child = Command::new(&self.path)
            .arg(kind.verb())
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context(SpawnSnafu { cmd: cmd.clone() })?;
        log::debug!("spawned '{}' as pid {}", cmd, child.id());
        let stderr = PipeReader::spawn::<ChildStderr>(child.stderr.take());

        match wait_child(&mut child, &cmd, name, timeout, cancel)? {
            Waited::TimedOut => Ok(ControlStatus::TimedOut),
            Waited::Exited(status) => Ok(ControlStatus::Exited {
                code: status.code().unwrap_or(-1),
                stderr: stderr.collect().context(IoSnafu)?.trim().to_string(),
            }),
        }
    }
}

/// Wait for `child` in slices so `cancel` is looked at while it runs. On
/// timeout, cancellation or a failed wait the child is killed and reaped.
fn wait_child(
    child: &mut Child,
    cmd: &str,
    name: &str,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<Waited> {
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            kill_child(child, cmd);
            return CancelledSnafu {
                name,
                stage: format!("waiting for '{}'", cmd),
            }
            .fail();
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            log::warn!("'{}' exceeded {:?}, killing it", cmd, timeout);
            kill_child(child, cmd);
            return Ok(Waited::TimedOut);
        }

        match child.wait_timeout(remaining.min(WAIT_SLICE)) {
            Ok(Some(status)) => return Ok(Waited::Exited(status)),
            Ok(None) => {}
            Err(e) => {
                kill_child(child, cmd);
                return Err(Error::Io { source: e });
            }
        }
    }
}

fn kill_child(child: &mut Child, cmd: &str) {
    if let Err(e) = child.kill() {
        log::error!("failed to kill '{}' (pid {}): {}", cmd, child.id(), e);
        return;
    }
    /* reap it, the exit status is of no interest */
    if let Err(e) = child.wait() {
        log::error!("failed to wait for killed '{}': {}", cmd, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ReconcileContext;
    use crate::verifier;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    const FAKE_SYSTEMCTL: &str = r#"#!/bin/sh
case "$1" in
    is-active)
        if [ "$2" = "nginx" ]; then echo active; exit 0; fi
        if [ "$2" = "hung" ]; then exec sleep 30; fi
        echo inactive; exit 3 ;;
    is-enabled)
        if [ "$2" = "nginx" ]; then echo enabled; exit 0; fi
        if [ "$2" = "sshd" ]; then echo disabled; exit 1; fi
        echo "Failed to get unit file state for $2.service: No such file or directory" >&2
        exit 1 ;;
    start)
        if [ "$2" = "noisy" ]; then
            head -c 200000 /dev/zero | tr '\0' x >&2
            exit 1
        fi
        exit 0 ;;
    enable|disable)
        exit 0 ;;
    stop)
        echo "Failed to stop $2.service: Unit $2.service not loaded." >&2
        exit 5 ;;
    restart|reload)
        exec sleep 5 ;;
esac
exit 1
"#;

    const LONG: Duration = Duration::from_secs(10);

    fn write_script(dir: &Path) -> String {
        let path = dir.join("systemctl");
        fs::write(&path, FAKE_SYSTEMCTL).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn check_queries(ctl: &SystemCtl) {
        let cancel = CancelToken::new();
        assert!(ctl.is_active("nginx", LONG, &cancel).unwrap());
        assert!(!ctl.is_active("httpd", LONG, &cancel).unwrap());
        assert!(ctl.is_enabled("nginx", LONG, &cancel).unwrap());
        assert!(!ctl.is_enabled("sshd", LONG, &cancel).unwrap());
        assert!(!ctl.is_enabled("no-such-unit", LONG, &cancel).unwrap());
    }

    fn check_hung_query(ctl: &SystemCtl) {
        /* the caller's budget bounds a query tighter than QueryTimeoutSec */
        let start = Instant::now();
        let ret = ctl.is_active("hung", Duration::from_millis(300), &CancelToken::new());
        assert!(matches!(ret, Err(Error::QueryUnavailable { .. })));
        assert!(start.elapsed() < Duration::from_secs(3));

        /* verification of a service whose query hangs ends at its deadline */
        let ctx = ReconcileContext::new(ctl, ctl).with_verify_interval(Duration::from_millis(100));
        let start = Instant::now();
        assert!(!verifier::verify(&ctx, "hung", Duration::from_secs(1)).unwrap());
        assert!(start.elapsed() < Duration::from_secs(3));

        /* and a cancel interrupts the hung query itself */
        let cancel = CancelToken::new();
        let ctx = ReconcileContext::new(ctl, ctl).with_cancel(cancel.clone());
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            cancel.cancel();
        });
        let start = Instant::now();
        let err = verifier::verify(&ctx, "hung", Duration::from_secs(30)).unwrap_err();
        handle.join().unwrap();
        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    fn check_control(ctl: &SystemCtl) {
        let cancel = CancelToken::new();
        let status = ctl.run(ActionKind::Start, "httpd", LONG, &cancel).unwrap();
        assert_eq!(
            status,
            ControlStatus::Exited {
                code: 0,
                stderr: String::new()
            }
        );

        match ctl.run(ActionKind::Stop, "httpd", LONG, &cancel).unwrap() {
            ControlStatus::Exited { code, stderr } => {
                assert_eq!(code, 5);
                assert_eq!(stderr, "Failed to stop httpd.service: Unit httpd.service not loaded.");
            }
            other => panic!("unexpected {:?}", other),
        }

        /* more output than a pipe buffer holds */
        match ctl.run(ActionKind::Start, "noisy", LONG, &cancel).unwrap() {
            ControlStatus::Exited { code, stderr } => {
                assert_eq!(code, 1);
                assert_eq!(stderr.len(), 200000);
            }
            other => panic!("unexpected {:?}", other),
        }

        let start = Instant::now();
        let status = ctl
            .run(ActionKind::Restart, "httpd", Duration::from_secs(1), &cancel)
            .unwrap();
        assert_eq!(status, ControlStatus::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(4));

        cancel.cancel();
        let err = ctl.run(ActionKind::Reload, "httpd", LONG, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    fn check_missing_executable() {
        let cancel = CancelToken::new();
        let ctl = SystemCtl::new("/nonexistent/systemctl", Duration::from_secs(1));
        assert!(matches!(
            ctl.is_active("nginx", LONG, &cancel),
            Err(Error::QueryUnavailable { .. })
        ));
        assert!(matches!(
            ctl.is_enabled("nginx", LONG, &cancel),
            Err(Error::QueryUnavailable { .. })
        ));

        let err = ctl
            .run(ActionKind::Start, "nginx", Duration::from_secs(1), &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert_eq!(err.get_errno(), Errno::ENOENT as i32);
    }

    /* All cases share one script and run in one test, so no other test
     * thread forks while the script is still open for writing. */
    #[test]
    fn test_systemctl_script() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = SystemCtl::new(&write_script(dir.path()), LONG);

        check_queries(&ctl);
        check_hung_query(&ctl);
        check_control(&ctl);
        check_missing_executable();
    }
}
