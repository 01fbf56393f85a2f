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

//! State Observer: one snapshot of a service.
//!
//! A broken query mechanism reads as "not running" so nothing downstream
//! waits on an observer that cannot answer. This also means "no such
//! service" and "cannot ask" look the same to the planner, only the warning
//! in the log tells them apart. Cancellation is the only error.

use crate::context::ReconcileContext;
use crate::error::*;
use crate::unit::ServiceSnapshot;
use std::time::Duration;

/// budget of a query nobody waits on, the collaborator's own bound applies
pub const NO_DEADLINE: Duration = Duration::MAX;

/// Query running and enablement state of `name`.
pub fn observe(ctx: &ReconcileContext, name: &str) -> Result<ServiceSnapshot> {
    let running = is_running(ctx, name, NO_DEADLINE)?;

    let enabled = match ctx.query().is_enabled(name, NO_DEADLINE, ctx.cancel_token()) {
        Ok(v) => Some(v),
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => {
            log::warn!("Failed to query enablement of {}, treat as unknown: {}", name, e);
            None
        }
    };

    let snapshot = ServiceSnapshot::new(name, running, enabled);
    log::debug!("observed {:?}", snapshot);
    Ok(snapshot)
}

/// Query the running state only, giving up after `budget`.
pub fn is_running(ctx: &ReconcileContext, name: &str, budget: Duration) -> Result<bool> {
    match ctx.query().is_active(name, budget, ctx.cancel_token()) {
        Ok(v) => Ok(v),
        Err(e) if e.is_cancelled() => Err(e),
        Err(e) => {
            log::warn!("Failed to query state of {}, treat as stopped: {}", name, e);
            Ok(false)
        }
    }
}
