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

//! Convergence Verifier.
//!
//! systemctl offers no notification when a unit becomes active, so after a
//! start the observer is polled at a fixed interval until the service is
//! running or the deadline passes. Each query is bounded by the time left,
//! and both the query and the sleep between polls watch the cancel token,
//! a caller may abort it at any time.

use crate::context::ReconcileContext;
use crate::error::*;
use crate::observer;
use std::time::{Duration, Instant};

/// Poll until `name` is running. Returns false once `deadline` has passed
/// without the service becoming active.
pub fn verify(ctx: &ReconcileContext, name: &str, deadline: Duration) -> Result<bool> {
    let start = Instant::now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let budget = deadline.saturating_sub(start.elapsed());
        if observer::is_running(ctx, name, budget)? {
            log::info!(
                "service {} is active after {} poll(s), {:?}",
                name,
                polls,
                start.elapsed()
            );
            return Ok(true);
        }

        let elapsed = start.elapsed();
        if elapsed >= deadline {
            log::error!("service {} still inactive after {:?}", name, elapsed);
            return Ok(false);
        }

        let nap = ctx.verify_interval().min(deadline - elapsed);
        log::debug!("service {} not active yet, poll again in {:?}", name, nap);
        if ctx.cancel_token().sleep(nap) {
            return CancelledSnafu {
                name,
                stage: "verifying".to_string(),
            }
            .fail();
        }
    }
}
