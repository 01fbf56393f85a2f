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

//! Cancellation handle shared between a reconciliation and its caller.
//! Cancelling never undoes an action that was already issued.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Clones share the same state, any clone may cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    ///
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Fire the token and wake up every waiter.
    pub fn cancel(&self) {
        let mut cancelled = match self.inner.cancelled.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    ///
    pub fn is_cancelled(&self) -> bool {
        match self.inner.cancelled.lock() {
            Ok(v) => *v,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Sleep for `dur` unless the token fires first.
    /// Returns true if the token was cancelled.
    pub fn sleep(&self, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        let mut cancelled = match self.inner.cancelled.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        };

        /* loop against spurious wakeups */
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match self.inner.cond.wait_timeout(cancelled, deadline - now) {
                Ok((v, _)) => v,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        true
    }
}
