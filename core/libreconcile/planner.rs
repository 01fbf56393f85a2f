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

//! Transition Planner.
//!
//! | desired   | running | action  |
//! |-----------|---------|---------|
//! | Started   | false   | Start   |
//! | Started   | true    | -       |
//! | Stopped   | true    | Stop    |
//! | Stopped   | false   | -       |
//! | Restarted | any     | Restart |
//! | Reloaded  | any     | Reload  |
//!
//! The enablement action is decided independently and always comes after the
//! state action.

use crate::unit::{Action, ActionKind, DesiredSpec, DesiredState, ServiceSnapshot};

/// Compute the ordered actions that move `snapshot` to `spec`. No I/O.
pub fn plan(snapshot: &ServiceSnapshot, spec: &DesiredSpec) -> Vec<Action> {
    let mut actions = Vec::new();

    if let Some(kind) = state_action(snapshot.running, spec.state()) {
        actions.push(Action::new(kind, spec.name(), spec.timeout()));
    }

    if let Some(kind) = enablement_action(snapshot.enabled, spec.enabled()) {
        actions.push(Action::new(kind, spec.name(), spec.timeout()));
    }

    actions
}

fn state_action(running: bool, desired: DesiredState) -> Option<ActionKind> {
    match (desired, running) {
        (DesiredState::Started, false) => Some(ActionKind::Start),
        (DesiredState::Started, true) => None,
        (DesiredState::Stopped, true) => Some(ActionKind::Stop),
        (DesiredState::Stopped, false) => None,
        (DesiredState::Restarted, _) => Some(ActionKind::Restart),
        (DesiredState::Reloaded, _) => Some(ActionKind::Reload),
    }
}

/* An unknown current enablement never matches, so the toggle is issued. */
fn enablement_action(current: Option<bool>, desired: Option<bool>) -> Option<ActionKind> {
    let desired = desired?;
    if current == Some(desired) {
        return None;
    }

    if desired {
        Some(ActionKind::Enable)
    } else {
        Some(ActionKind::Disable)
    }
}
