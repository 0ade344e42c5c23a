//! Action token dispatch.
//!
//! Dialogue lines and choices carry data-only [`ActionToken`]s. This module
//! maps each token to its effect on the [`ProgressionStore`] or to a signal
//! for the scene's [`MissionFlow`]. Dispatch never fails: problems are logged
//! and the remaining tokens still run.
//!
//! Every executed token logs an audit line:
//! ```text
//! └─ action: TokenName(parameters)
//! ```

use log::{info, warn};
use trilha_data::ActionToken;

use crate::progression::ProgressionStore;

/// Scene-side collaborator that reacts to mission and task progress.
pub trait MissionFlow {
    /// The scene's mission has been completed.
    fn notify_mission_complete(&mut self);

    /// The task `task_id` has been completed and the flow should move on.
    fn notify_task_advanced(&mut self, task_id: &str);

    /// Refresh whatever task is currently shown to the player.
    fn update_current_task(&mut self) {}
}

/// A mission flow that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMissionFlow;

impl MissionFlow for NoMissionFlow {
    fn notify_mission_complete(&mut self) {}

    fn notify_task_advanced(&mut self, _task_id: &str) {}
}

/// Capabilities available to action tokens.
pub struct DispatchContext<'a> {
    pub store: &'a mut ProgressionStore,
    pub mission_flow: &'a mut dyn MissionFlow,
    /// Mission owned by the current conversation, if any.
    pub mission_id: Option<&'a str>,
}

/// Execute `tokens` in order.
pub fn execute(tokens: &[ActionToken], ctx: &mut DispatchContext<'_>) {
    for token in tokens {
        dispatch_action(token, ctx);
    }
}

/// Execute a single token.
pub fn dispatch_action(token: &ActionToken, ctx: &mut DispatchContext<'_>) {
    match token {
        ActionToken::CompleteMission => complete_mission(ctx),
        ActionToken::UpdateCurrentTask => {
            info!("└─ action: UpdateCurrentTask");
            ctx.mission_flow.update_current_task();
        },
        ActionToken::CompleteTask { task_id } => {
            info!("└─ action: CompleteTask({task_id})");
            ctx.mission_flow.notify_task_advanced(task_id);
        },
        ActionToken::AwardPoints { amount } => award_points(ctx.store, *amount),
        ActionToken::AwardBadge { badge_id } => {
            let new = ctx.store.add_badge(badge_id);
            info!("└─ action: AwardBadge({badge_id}){}", if new { "" } else { " [already held]" });
        },
        ActionToken::MarkMission { mission_id } => {
            let new = ctx.store.complete_mission(mission_id);
            info!(
                "└─ action: MarkMission({mission_id}){}",
                if new { "" } else { " [already complete]" }
            );
        },
        ActionToken::Unknown => {
            warn!("└─ action: <unknown token kind> skipped");
        },
    }
}

/// Record the conversation's mission (if it has one) and tell the mission flow.
fn complete_mission(ctx: &mut DispatchContext<'_>) {
    match ctx.mission_id {
        Some(mission_id) => {
            let new = ctx.store.complete_mission(mission_id);
            info!(
                "└─ action: CompleteMission({mission_id}){}",
                if new { "" } else { " [already complete]" }
            );
        },
        None => info!("└─ action: CompleteMission(<scene mission>)"),
    }
    ctx.mission_flow.notify_mission_complete();
}

fn award_points(store: &mut ProgressionStore, amount: i64) {
    match store.add_points(amount) {
        Ok(awarded) => {
            info!(
                "└─ action: AwardPoints({amount}) -> total {}{}",
                awarded.total,
                if awarded.level_changed { ", level up" } else { "" }
            );
        },
        Err(err) => warn!("└─ action: AwardPoints({amount}) ignored: {err}"),
    }
}
