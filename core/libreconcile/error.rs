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

//! Error define, there is one Error for the whole reconcile crate.
//! Every fatal failure of a reconciliation carries the service name, and the
//! attempted action and elapsed time where they are known.

use crate::unit::ActionKind;
pub use nix::errno::Errno;
use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;
use std::time::Duration;

/// reconcile Error
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// the desired state input was rejected before any observation
    #[snafu(display("Invalid spec: {}", what))]
    InvalidSpec { what: String },

    /// the query mechanism could not answer, the observer recovers from it
    #[snafu(display("Query for service {} unavailable: {}", name, msg))]
    QueryUnavailable { name: String, msg: String },

    #[snafu(display(
        "Timeout to {} service {} after {:.1} seconds",
        kind,
        name,
        elapsed.as_secs_f64()
    ))]
    ActionTimeout {
        name: String,
        kind: ActionKind,
        elapsed: Duration,
    },

    #[snafu(display("Failed to {} service {}: {}", kind, name, detail))]
    ActionFailed {
        name: String,
        kind: ActionKind,
        detail: String,
    },

    /// the start command succeeded but the service never became active
    #[snafu(display(
        "Service {} did not start within {} seconds (waited {:.1} seconds)",
        name,
        timeout,
        elapsed.as_secs_f64()
    ))]
    VerificationTimeout {
        name: String,
        timeout: u64,
        elapsed: Duration,
    },

    #[snafu(display("Reconciliation of service {} cancelled while {}", name, stage))]
    Cancelled { name: String, stage: String },

    #[snafu(display("Failed to spawn '{}': {}", cmd, source))]
    Spawn { cmd: String, source: std::io::Error },

    #[snafu(display("Io: {}", source))]
    Io { source: std::io::Error },

    #[snafu(display("Confique error: {}", source))]
    Confique { source: confique::Error },
}

impl Error {
    /// Translate the error to error number, used as the exit code of sreconcile.
    pub fn get_errno(&self) -> i32 {
        match self {
            Error::InvalidSpec { .. } => Errno::EINVAL as i32,
            Error::QueryUnavailable { .. } => Errno::ENOTCONN as i32,
            Error::ActionTimeout { .. } => Errno::ETIMEDOUT as i32,
            Error::ActionFailed { .. } => Errno::EIO as i32,
            Error::VerificationTimeout { .. } => Errno::ETIME as i32,
            Error::Cancelled { .. } => Errno::ECANCELED as i32,
            Error::Spawn { source, .. } => source.raw_os_error().unwrap_or(Errno::ENOENT as i32),
            Error::Io { source } => source.raw_os_error().unwrap_or(Errno::EIO as i32),
            Error::Confique { .. } => Errno::EINVAL as i32,
        }
    }

    /// Whether the error was raised because the caller cancelled the run.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

///
pub type Result<T, E = Error> = std::result::Result<T, E>;
