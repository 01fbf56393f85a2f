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

//! The entities of one reconciliation. All of them are created, used and
//! dropped within a single call, none of them is persisted.

use crate::error::*;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// the state the caller wants the service to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DesiredState {
    /// service is running
    #[default]
    Started,
    /// service is not running
    Stopped,
    /// service is restarted unconditionally
    Restarted,
    /// service reloads its configuration unconditionally
    Reloaded,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Started => write!(f, "started"),
            DesiredState::Stopped => write!(f, "stopped"),
            DesiredState::Restarted => write!(f, "restarted"),
            DesiredState::Reloaded => write!(f, "reloaded"),
        }
    }
}

impl FromStr for DesiredState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "started" => Ok(DesiredState::Started),
            "stopped" => Ok(DesiredState::Stopped),
            "restarted" => Ok(DesiredState::Restarted),
            "reloaded" => Ok(DesiredState::Reloaded),
            _ => InvalidSpecSnafu {
                what: format!(
                    "unknown state '{}', expected one of started, stopped, restarted, reloaded",
                    s
                ),
            }
            .fail(),
        }
    }
}

/// the observable run state reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    ///
    Started,
    ///
    Stopped,
}

impl ServiceState {
    ///
    pub fn from_running(running: bool) -> Self {
        if running {
            ServiceState::Started
        } else {
            ServiceState::Stopped
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Started => write!(f, "started"),
            ServiceState::Stopped => write!(f, "stopped"),
        }
    }
}

impl Serialize for ServiceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One observation of a service. Produced fresh on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSnapshot {
    /// service name
    pub name: String,
    /// whether the service reported active
    pub running: bool,
    /// boot-enablement, None if the query mechanism could not tell
    pub enabled: Option<bool>,
}

impl ServiceSnapshot {
    ///
    pub fn new(name: &str, running: bool, enabled: Option<bool>) -> Self {
        ServiceSnapshot {
            name: name.to_string(),
            running,
            enabled,
        }
    }

    ///
    pub fn state(&self) -> ServiceState {
        ServiceState::from_running(self.running)
    }
}

/// What one invocation asks for. Validated on construction and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSpec {
    name: String,
    state: DesiredState,
    enabled: Option<bool>,
    verify: bool,
    timeout_secs: u64,
}

impl DesiredSpec {
    /// default per-action timeout in seconds
    pub const DEFAULT_TIMEOUT_SEC: u64 = 60;

    /// Create a spec, rejecting malformed input before anything is observed.
    pub fn new(
        name: &str,
        state: DesiredState,
        enabled: Option<bool>,
        verify: bool,
        timeout_secs: u64,
    ) -> Result<Self> {
        validate_name(name)?;
        if timeout_secs == 0 {
            return InvalidSpecSnafu {
                what: format!("timeout of service {} must be a positive number of seconds", name),
            }
            .fail();
        }

        Ok(DesiredSpec {
            name: name.to_string(),
            state,
            enabled,
            verify,
            timeout_secs,
        })
    }

    /// A spec for `name` with all defaults: started, enablement untouched,
    /// verified, 60 seconds.
    pub fn with_defaults(name: &str) -> Result<Self> {
        DesiredSpec::new(
            name,
            DesiredState::default(),
            None,
            true,
            Self::DEFAULT_TIMEOUT_SEC,
        )
    }

    ///
    pub fn name(&self) -> &str {
        &self.name
    }

    ///
    pub fn state(&self) -> DesiredState {
        self.state
    }

    ///
    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    ///
    pub fn verify(&self) -> bool {
        self.verify
    }

    ///
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// the per-action budget, also the verification deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return InvalidSpecSnafu {
            what: "service name must not be empty".to_string(),
        }
        .fail();
    }

    /* A leading dash would be taken as an option by the control command. */
    if name.starts_with('-') {
        return InvalidSpecSnafu {
            what: format!("service name '{}' must not start with '-'", name),
        }
        .fail();
    }

    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return InvalidSpecSnafu {
            what: format!("service name '{}' contains whitespace or control characters", name),
        }
        .fail();
    }

    Ok(())
}

/// the verbs understood by the control interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ///
    Start,
    ///
    Stop,
    ///
    Restart,
    ///
    Reload,
    ///
    Enable,
    ///
    Disable,
}

impl ActionKind {
    /// the command line verb
    pub fn verb(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Restart => "restart",
            ActionKind::Reload => "reload",
            ActionKind::Enable => "enable",
            ActionKind::Disable => "disable",
        }
    }

    /// enable and disable touch the boot configuration only
    pub fn is_enablement(&self) -> bool {
        matches!(self, ActionKind::Enable | ActionKind::Disable)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb())
    }
}

/// one planned state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// what to do
    pub kind: ActionKind,
    /// the service to do it to
    pub name: String,
    /// hard budget of the control command
    pub timeout: Duration,
}

impl Action {
    ///
    pub fn new(kind: ActionKind, name: &str, timeout: Duration) -> Self {
        Action {
            kind,
            name: name.to_string(),
            timeout,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// how an issued action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// the command exited zero
    Succeeded,
    /// the command exited non-zero or could not be run
    Failed,
    /// the command was killed after exceeding its budget
    TimedOut,
}

/// the classified result of one executed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    ///
    pub action: Action,
    ///
    pub status: OutcomeStatus,
    /// diagnostic output of the command, empty on success
    pub detail: String,
    /// wall-clock time the command took
    pub elapsed: Duration,
}

impl ActionOutcome {
    ///
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    /// Turn a failed or timed-out outcome into the error that aborts the
    /// reconciliation. A succeeded outcome is returned untouched.
    pub fn into_result(self) -> Result<ActionOutcome> {
        match self.status {
            OutcomeStatus::Succeeded => Ok(self),
            OutcomeStatus::Failed => ActionFailedSnafu {
                name: self.action.name,
                kind: self.action.kind,
                detail: self.detail,
            }
            .fail(),
            OutcomeStatus::TimedOut => ActionTimeoutSnafu {
                name: self.action.name,
                kind: self.action.kind,
                elapsed: self.elapsed,
            }
            .fail(),
        }
    }
}

/// what a successful reconciliation reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// service name
    pub name: String,
    /// run state after the reconciliation
    #[serde(rename = "state")]
    pub final_state: ServiceState,
    /// boot-enablement after the reconciliation, only if it was asked for
    #[serde(rename = "enabled", skip_serializing_if = "Option::is_none")]
    pub final_enabled: Option<bool>,
    /// whether at least one action took effect
    pub changed: bool,
}
