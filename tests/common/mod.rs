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

#![allow(dead_code)]

use reconcile::error::{CancelledSnafu, QueryUnavailableSnafu};
use reconcile::{ActionKind, CancelToken, ControlStatus, Result, ServiceControl, ServiceQuery};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    running: bool,
    enabled: bool,
    query_broken: bool,
    never_activates: bool,
    /* inactive answers still owed after a start */
    pending_polls: Option<u32>,
    activate_after: u32,
    scripted: HashMap<ActionKind, ControlStatus>,
    issued: Vec<ActionKind>,
    active_queries: u32,
    enabled_queries: u32,
}

/// A scripted service manager holding a single service.
pub struct FakeSystem {
    state: Mutex<FakeState>,
}

impl FakeSystem {
    pub fn new(running: bool, enabled: bool) -> Self {
        FakeSystem {
            state: Mutex::new(FakeState {
                running,
                enabled,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn fail(&self, kind: ActionKind, code: i32, stderr: &str) {
        let status = ControlStatus::Exited {
            code,
            stderr: stderr.to_string(),
        };
        self.with(|s| s.scripted.insert(kind, status));
    }

    pub fn time_out(&self, kind: ActionKind) {
        self.with(|s| s.scripted.insert(kind, ControlStatus::TimedOut));
    }

    /// a started service answers inactive this many times first
    pub fn activate_after(&self, polls: u32) {
        self.with(|s| s.activate_after = polls);
    }

    pub fn never_activate(&self) {
        self.with(|s| s.never_activates = true);
    }

    pub fn break_queries(&self) {
        self.with(|s| s.query_broken = true);
    }

    pub fn issued(&self) -> Vec<ActionKind> {
        self.with(|s| s.issued.clone())
    }

    pub fn active_queries(&self) -> u32 {
        self.with(|s| s.active_queries)
    }

    pub fn queries(&self) -> u32 {
        self.with(|s| s.active_queries + s.enabled_queries)
    }

    pub fn is_running(&self) -> bool {
        self.with(|s| s.running)
    }

    pub fn is_enabled_now(&self) -> bool {
        self.with(|s| s.enabled)
    }
}

fn check_cancel(name: &str, stage: &str, cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        return CancelledSnafu { name, stage }.fail();
    }
    Ok(())
}

impl ServiceQuery for FakeSystem {
    fn is_active(&self, name: &str, _budget: Duration, cancel: &CancelToken) -> Result<bool> {
        check_cancel(name, "querying state", cancel)?;
        let mut s = self.state.lock().unwrap();
        s.active_queries += 1;
        if s.query_broken {
            return QueryUnavailableSnafu {
                name,
                msg: "Failed to connect to bus: No such file or directory",
            }
            .fail();
        }

        match s.pending_polls {
            Some(0) => {
                s.pending_polls = None;
                s.running = true;
            }
            Some(n) => s.pending_polls = Some(n - 1),
            None => {}
        }
        Ok(s.running)
    }

    fn is_enabled(&self, name: &str, _budget: Duration, cancel: &CancelToken) -> Result<bool> {
        check_cancel(name, "querying enablement", cancel)?;
        let mut s = self.state.lock().unwrap();
        s.enabled_queries += 1;
        if s.query_broken {
            return QueryUnavailableSnafu {
                name,
                msg: "Failed to connect to bus: No such file or directory",
            }
            .fail();
        }
        Ok(s.enabled)
    }
}

impl ServiceControl for FakeSystem {
    fn run(
        &self,
        kind: ActionKind,
        name: &str,
        _timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<ControlStatus> {
        check_cancel(name, &format!("running {}", kind), cancel)?;

        let mut s = self.state.lock().unwrap();
        s.issued.push(kind);
        let status = s.scripted.get(&kind).cloned().unwrap_or(ControlStatus::Exited {
            code: 0,
            stderr: String::new(),
        });
        if status
            != (ControlStatus::Exited {
                code: 0,
                stderr: String::new(),
            })
        {
            return Ok(status);
        }

        match kind {
            ActionKind::Start if s.never_activates => {}
            ActionKind::Start if s.activate_after > 0 => {
                s.pending_polls = Some(s.activate_after);
            }
            ActionKind::Start | ActionKind::Restart => s.running = true,
            ActionKind::Stop => s.running = false,
            ActionKind::Reload => {}
            ActionKind::Enable => s.enabled = true,
            ActionKind::Disable => s.enabled = false,
        }
        Ok(status)
    }
}
