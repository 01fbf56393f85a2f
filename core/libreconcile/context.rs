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

//! Per-invocation context. There is no process-wide state, every
//! reconciliation gets the collaborators it talks to from here.

use crate::cancel::CancelToken;
use crate::interface::{ServiceControl, ServiceQuery};
use std::time::Duration;

/// the interval the verifier polls the observer at
pub const VERIFY_INTERVAL_DEFAULT: Duration = Duration::from_secs(1);

///
pub struct ReconcileContext<'a> {
    query: &'a dyn ServiceQuery,
    control: &'a dyn ServiceControl,
    cancel: CancelToken,
    verify_interval: Duration,
}

impl<'a> ReconcileContext<'a> {
    ///
    pub fn new(query: &'a dyn ServiceQuery, control: &'a dyn ServiceControl) -> Self {
        ReconcileContext {
            query,
            control,
            cancel: CancelToken::new(),
            verify_interval: VERIFY_INTERVAL_DEFAULT,
        }
    }

    /// thread the caller's cancel token through executor and verifier
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// a zero interval keeps the default
    pub fn with_verify_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.verify_interval = interval;
        }
        self
    }

    pub(crate) fn query(&self) -> &dyn ServiceQuery {
        self.query
    }

    pub(crate) fn control(&self) -> &dyn ServiceControl {
        self.control
    }

    ///
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    ///
    pub fn verify_interval(&self) -> Duration {
        self.verify_interval
    }
}
