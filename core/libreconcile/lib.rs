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

//! Idempotent service lifecycle reconciler.
//!
//! dependency:
//!
//!```text
//!            [reconciler]
//!           ↙    ↓    ↓    ↘
//! [observer] [planner] [executor] [verifier]
//!      ↓                    ↓        ↓
//!   [ServiceQuery]   [ServiceControl] [observer]
//!           ↖          ↗
//!            [systemctl]
//!```
//!
//! One call to [`Reconciler::reconcile`] observes the service through the
//! [`ServiceQuery`] collaborator, plans the minimal set of actions, issues
//! them through the [`ServiceControl`] collaborator, optionally waits for the
//! service to become active, and reports whether anything changed. Nothing is
//! remembered between calls.

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod interface;
pub mod logger;
pub mod observer;
pub mod planner;
pub mod reconciler;
pub mod systemctl;
pub mod unit;
pub mod verifier;

pub use cancel::CancelToken;
pub use config::ReconcileConfig;
pub use context::ReconcileContext;
pub use error::{Error, Result};
pub use interface::{ControlStatus, ServiceControl, ServiceQuery};
pub use reconciler::{ReconcileStage, Reconciler};
pub use systemctl::SystemCtl;
pub use unit::{
    Action, ActionKind, ActionOutcome, DesiredSpec, DesiredState, OutcomeStatus,
    ReconciliationResult, ServiceSnapshot, ServiceState,
};

/* lets the scripted service manager shared with tests/ name this crate */
#[cfg(test)]
extern crate self as reconcile;

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
pub(crate) mod fake;
