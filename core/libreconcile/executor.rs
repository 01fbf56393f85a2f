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

//! Action Executor: issue one action and classify how it ended.
//! Nothing is retried here, a flaky control command always surfaces.

use crate::context::ReconcileContext;
use crate::error::*;
use crate::interface::ControlStatus;
use crate::unit::{Action, ActionOutcome, OutcomeStatus};
use std::time::Instant;

/// Run `action` within its timeout. Only cancellation is returned as an
/// error, every other failure is an outcome.
pub fn execute(ctx: &ReconcileContext, action: &Action) -> Result<ActionOutcome> {
    if ctx.cancel_token().is_cancelled() {
        return CancelledSnafu {
            name: action.name.as_str(),
            stage: format!("about to {}", action.kind),
        }
        .fail();
    }

    log::info!("{} service {} (timeout {}s)", action.kind, action.name, action.timeout.as_secs());

    let start = Instant::now();
    let ret = ctx
        .control()
        .run(action.kind, &action.name, action.timeout, ctx.cancel_token());
    let elapsed = start.elapsed();

    let (status, detail) = match ret {
        Ok(ControlStatus::Exited { code: 0, .. }) => (OutcomeStatus::Succeeded, String::new()),
        Ok(ControlStatus::Exited { code, stderr }) => {
            let detail = if stderr.is_empty() {
                format!("exit code {}", code)
            } else {
                format!("exit code {}: {}", code, stderr)
            };
            (OutcomeStatus::Failed, detail)
        }
        Ok(ControlStatus::TimedOut) => (
            OutcomeStatus::TimedOut,
            format!("killed after {} seconds", action.timeout.as_secs()),
        ),
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => (OutcomeStatus::Failed, e.to_string()),
    };

    match status {
        OutcomeStatus::Succeeded => log::debug!("{} finished in {:?}", action, elapsed),
        _ => log::error!("{} ended {:?} after {:?}: {}", action, status, elapsed, detail),
    }

    Ok(ActionOutcome {
        action: action.clone(),
        status,
        detail,
        elapsed,
    })
}
