use std::collections::VecDeque;

use tracing::debug;

use super::{next_actions, Action, Outcome, Phase, Step};
use crate::config::ShrinkConfig;
use crate::context::SyncContext;
use crate::error::RelsyncError;
use crate::release::Release;

/// A Release plus its pending action queue.
pub struct Pipeline {
    release: Release,
    queue: VecDeque<Action>,
}

impl Pipeline {
    /// Seed the queue with the Resolve phase.
    pub fn new(mut release: Release, shrink: &ShrinkConfig) -> Self {
        release.phase = Phase::Resolve;
        let queue = next_actions(&release, Phase::Resolve, shrink).into();
        Self { release, queue }
    }

    pub fn release(&self) -> &Release {
        &self.release
    }

    pub fn pending(&self) -> impl Iterator<Item = &Action> {
        self.queue.iter()
    }

    /// Drain the queue in order until the release finishes, turns out to be
    /// current already, or an action fails.
    pub async fn run(self, ctx: &SyncContext) -> (Release, Outcome) {
        let Pipeline {
            mut release,
            mut queue,
        } = self;

        if ctx.cancel.is_cancelled() {
            return (release, Outcome::Failed(RelsyncError::Cancelled));
        }

        while let Some(action) = queue.pop_front() {
            debug!(
                repo = %release.repo(),
                phase = %release.phase,
                action = action.name(),
                "executing"
            );
            match action.execute(&mut release, ctx).await {
                Ok(Step::Continue) => {}
                Ok(Step::Replace(phase)) => {
                    release.phase = phase;
                    queue = next_actions(&release, phase, &ctx.shrink).into();
                }
                Ok(Step::AlreadyCurrent) => return (release, Outcome::AlreadyCurrent),
                Ok(Step::Finished) => {
                    release.phase = Phase::Done;
                    queue.clear();
                }
                Err(e) => return (release, Outcome::Failed(e)),
            }
        }
        (release, Outcome::Updated)
    }
}

/// Run one release to completion.
pub async fn run(release: Release, ctx: &SyncContext) -> (Release, Outcome) {
    Pipeline::new(release, &ctx.shrink).run(ctx).await
}
