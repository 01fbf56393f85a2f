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

//! The two collaborators a reconciliation talks to.

use crate::cancel::CancelToken;
use crate::error::*;
use crate::unit::ActionKind;
use std::time::Duration;

/// Reports the current state of a service.
///
/// An unknown or inactive service is valid data and must be answered with
/// `Ok(false)`. `Err` is reserved for a broken query mechanism, usually
/// [`Error::QueryUnavailable`], and for cancellation.
///
/// A query must give up once `budget` elapses, the implementation may bound
/// it tighter. When `cancel` fires it must stop waiting and return
/// [`Error::Cancelled`].
pub trait ServiceQuery {
    /// whether the service is active now
    fn is_active(&self, name: &str, budget: Duration, cancel: &CancelToken) -> Result<bool>;

    /// whether the service is started at boot
    fn is_enabled(&self, name: &str, budget: Duration, cancel: &CancelToken) -> Result<bool>;
}

/// how a control command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlStatus {
    /// the command ran to completion
    Exited {
        /// exit code, -1 if it was killed by a signal
        code: i32,
        /// diagnostic output
        stderr: String,
    },
    /// the command was forcibly terminated after the timeout
    TimedOut,
}

/// Issues state transitions to the init system.
pub trait ServiceControl {
    /// Run `kind` for `name`. The implementation must terminate the
    /// underlying operation once `timeout` elapses and report
    /// [`ControlStatus::TimedOut`]. When `cancel` fires it must stop waiting
    /// and return [`Error::Cancelled`].
    fn run(
        &self,
        kind: ActionKind,
        name: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<ControlStatus>;
}
