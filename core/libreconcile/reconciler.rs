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

//! Reconciler: observe, plan, execute, verify, report.
//!
//! ```text
//! Idle → Observed → Planned → Executing → Verifying → Done
//!                                 ↓            ↓
//!                               Failed       Failed
//! ```
//!
//! The first failed or timed-out action ends the run, later actions are not
//! attempted so the error names a single root cause. Actions that already
//! succeeded stay in effect. The machine runs once, retrying a whole
//! reconciliation is up to the caller.

use crate::context::ReconcileContext;
use crate::error::*;
use crate::executor;
use crate::observer;
use crate::planner;
use crate::unit::{
    Action, ActionKind, ActionOutcome, DesiredSpec, ReconciliationResult, ServiceState,
};
use crate::verifier;
use std::fmt;
use std::time::Instant;

/// the stages of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    ///
    Idle,
    ///
    Observed,
    ///
    Planned,
    ///
    Executing,
    ///
    Verifying,
    ///
    Done,
    ///
    Failed,
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconcileStage::Idle => "idle",
            ReconcileStage::Observed => "observed",
            ReconcileStage::Planned => "planned",
            ReconcileStage::Executing => "executing",
            ReconcileStage::Verifying => "verifying",
            ReconcileStage::Done => "done",
            ReconcileStage::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One reconciliation of one service.
pub struct Reconciler<'a> {
    ctx: &'a ReconcileContext<'a>,
    spec: DesiredSpec,
    stage: ReconcileStage,
    outcomes: Vec<ActionOutcome>,
}

impl<'a> Reconciler<'a> {
    ///
    pub fn new(ctx: &'a ReconcileContext<'a>, spec: DesiredSpec) -> Self {
        Reconciler {
            ctx,
            spec,
            stage: ReconcileStage::Idle,
            outcomes: Vec::new(),
        }
    }

    ///
    pub fn stage(&self) -> ReconcileStage {
        self.stage
    }

    /// the outcomes of the actions issued so far, in order
    pub fn outcomes(&self) -> &[ActionOutcome] {
        &self.outcomes
    }

    /// Converge the service towards its [`DesiredSpec`] and report the final state.
    pub fn reconcile(&mut self) -> Result<ReconciliationResult> {
        self.ensure_idle()?;

        match self.converge() {
            Ok(result) => {
                self.transition(ReconcileStage::Done);
                log::info!(
                    "service {} reconciled: state={}, changed={}",
                    result.name,
                    result.final_state,
                    result.changed
                );
                Ok(result)
            }
            Err(e) => {
                self.transition(ReconcileStage::Failed);
                log::error!("{}", e);
                Err(e)
            }
        }
    }

    /// Observe and plan only. Nothing is issued; the result predicts what
    /// [`Reconciler::reconcile`] would report.
    pub fn check(&mut self) -> Result<ReconciliationResult> {
        self.ensure_idle()?;

        let snapshot = observer::observe(self.ctx, self.spec.name())?;
        self.transition(ReconcileStage::Observed);

        let actions = planner::plan(&snapshot, &self.spec);
        self.transition(ReconcileStage::Planned);
        for action in actions.iter() {
            log::info!("check mode: would {}", action);
        }

        let final_state = actions
            .iter()
            .fold(snapshot.state(), |state, action| match action.kind {
                ActionKind::Start | ActionKind::Restart => ServiceState::Started,
                ActionKind::Stop => ServiceState::Stopped,
                _ => state,
            });

        self.transition(ReconcileStage::Done);
        Ok(ReconciliationResult {
            name: self.spec.name().to_string(),
            final_state,
            final_enabled: self.spec.enabled(),
            changed: !actions.is_empty(),
        })
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.stage != ReconcileStage::Idle {
            return InvalidSpecSnafu {
                what: format!(
                    "reconciliation of {} already ran ({}), create a new reconciler",
                    self.spec.name(),
                    self.stage
                ),
            }
            .fail();
        }
        Ok(())
    }

    fn transition(&mut self, stage: ReconcileStage) {
        log::debug!(
            "service {}: {} -> {}",
            self.spec.name(),
            self.stage,
            stage
        );
        self.stage = stage;
    }

    fn converge(&mut self) -> Result<ReconciliationResult> {
        let name = self.spec.name().to_string();

        let snapshot = observer::observe(self.ctx, &name)?;
        self.transition(ReconcileStage::Observed);

        let actions = planner::plan(&snapshot, &self.spec);
        self.transition(ReconcileStage::Planned);
        if actions.is_empty() {
            log::info!("service {} already in desired state", name);
        }

        self.transition(ReconcileStage::Executing);
        self.execute_all(&actions)?;

        let started = self
            .outcomes
            .iter()
            .any(|o| o.action.kind == ActionKind::Start && o.is_success());
        if started && self.spec.verify() {
            self.transition(ReconcileStage::Verifying);
            let begin = Instant::now();
            if !verifier::verify(self.ctx, &name, self.spec.timeout())? {
                return VerificationTimeoutSnafu {
                    name,
                    timeout: self.spec.timeout_secs(),
                    elapsed: begin.elapsed(),
                }
                .fail();
            }
        }

        /* report what the system says now, not what the plan intended */
        let (final_state, final_enabled) = match self.spec.enabled() {
            Some(_) => {
                let snapshot = observer::observe(self.ctx, &name)?;
                (snapshot.state(), Some(snapshot.enabled.unwrap_or(false)))
            }
            None => (
                ServiceState::from_running(observer::is_running(
                    self.ctx,
                    &name,
                    observer::NO_DEADLINE,
                )?),
                None,
            ),
        };

        Ok(ReconciliationResult {
            name,
            final_state,
            final_enabled,
            changed: self.outcomes.iter().any(|o| o.is_success()),
        })
    }

    fn execute_all(&mut self, actions: &[Action]) -> Result<()> {
        for action in actions {
            let outcome = executor::execute(self.ctx, action)?;
            self.outcomes.push(outcome.clone());
            outcome.into_result()?;
        }
        Ok(())
    }
}
