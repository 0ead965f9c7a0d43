use std::{
    num::NonZeroU64,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use anyhow::Result;

use finger_core::{Action, JointConfiguration, Kinematics, Observation, Platform, TimeIndex};

use crate::{
    fusion::FusedTarget,
    planner::{IkMotionPlanner, IkSolution},
    smoother::TrajectorySmoother,
    tracking::TargetSource,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Running,
}

/// What happened during one control tick.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub tick: u64,
    pub time_index: TimeIndex,
    pub observation: Observation,
    pub target: FusedTarget,
    // `None` when the command was held for lack of a target
    pub ik: Option<IkSolution>,
    pub commanded: JointConfiguration,
}

/// Fixed-rate servo loop: one action out and one observation in per tick.
///
/// The commanded configuration is owned here and only ever moves through the
/// smoother. Missing targets and non-converged IK hold or approximate the
/// command, only platform failures end the loop.
pub struct ControlLoop<P, T, K> {
    platform: P,
    target_source: T,
    planner: IkMotionPlanner<K>,
    smoother: TrajectorySmoother,

    initial_posture: JointConfiguration,
    init_hold_ticks: u64,
    hold_sleep: Duration,
    diagnostics_every: NonZeroU64,

    state: LoopState,
    commanded: JointConfiguration,
    tick: u64,
}

impl<P, T, K> ControlLoop<P, T, K>
where
    P: Platform,
    T: TargetSource,
    K: Kinematics,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform: P,
        target_source: T,
        planner: IkMotionPlanner<K>,
        smoother: TrajectorySmoother,
        initial_posture: JointConfiguration,
        init_hold_ticks: u64,
        hold_sleep: Duration,
        diagnostics_every: NonZeroU64,
    ) -> Self {
        Self {
            platform,
            target_source,
            planner,
            smoother,
            commanded: initial_posture.clone(),
            initial_posture,
            init_hold_ticks,
            hold_sleep,
            diagnostics_every,
            state: LoopState::Init,
            tick: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn commanded(&self) -> &JointConfiguration {
        &self.commanded
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn target_source(&self) -> &T {
        &self.target_source
    }

    /// Moves to the initial posture and holds it for `init_hold_ticks` steps.
    pub fn initialize(&mut self) -> Result<()> {
        let hold = Action::new(self.initial_posture.clone());
        for _ in 0..self.init_hold_ticks {
            let t = self.platform.append_desired_action(&hold)?;
            self.platform.get_observation(t)?;
        }
        self.commanded = self.initial_posture.clone();
        self.state = LoopState::Running;
        log::info!("initial posture reached after {} steps", self.init_hold_ticks);
        Ok(())
    }

    pub fn tick(&mut self) -> Result<TickReport> {
        if self.state == LoopState::Init {
            self.initialize()?;
        }

        let t = self
            .platform
            .append_desired_action(&Action::new(self.commanded.clone()))?;
        let observation = self.platform.get_observation(t)?;
        let target = self.target_source.acquire()?;

        let ik = match target.position() {
            None => {
                if !self.hold_sleep.is_zero() {
                    std::thread::sleep(self.hold_sleep);
                }
                None
            }
            Some(position) => {
                let solution = self.planner.plan(position, &observation.position)?;
                self.commanded = self.smoother.smooth(&self.commanded, &solution.joints);
                Some(solution)
            }
        };

        let tick = self.tick;
        self.tick += 1;
        if tick % self.diagnostics_every.get() == 0 {
            self.log_diagnostics(tick, &target, ik.as_ref(), &observation)?;
        }

        Ok(TickReport {
            tick,
            time_index: t,
            observation,
            target,
            ik,
            commanded: self.commanded.clone(),
        })
    }

    fn log_diagnostics(
        &self,
        tick: u64,
        target: &FusedTarget,
        ik: Option<&IkSolution>,
        observation: &Observation,
    ) -> Result<()> {
        let (Some(position), Some(ik)) = (target.position(), ik) else {
            log::info!("tick {tick}: no target");
            return Ok(());
        };
        let tip = self.planner.tip_position(&observation.position)?;
        log::info!(
            "tick {tick}: target [{:.4}, {:.4}, {:.4}] goal [{:.4}, {:.4}, {:.4}] tip [{:.4}, {:.4}, {:.4}] residual {:.5}",
            position.x,
            position.y,
            position.z,
            ik.goal.x,
            ik.goal.y,
            ik.goal.z,
            tip.x,
            tip.y,
            tip.z,
            ik.residual
        );
        Ok(())
    }

    /// Ticks until `stop` is set. Returns the number of ticks run.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<u64> {
        if self.state == LoopState::Init {
            self.initialize()?;
        }
        let start = self.tick;
        while !stop.load(Ordering::Relaxed) {
            self.tick()?;
        }
        log::info!("servo loop stopped after {} ticks", self.tick - start);
        Ok(self.tick - start)
    }
}
