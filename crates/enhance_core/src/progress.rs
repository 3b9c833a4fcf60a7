//! Smoothed progress display.
//!
//! The presenter separates the progress value reported by the server (the
//! *target*) from the value shown on screen. Increases are animated in fixed
//! steps; anything that does not move forward is applied immediately.

use std::time::Duration;

/// Wall-clock shape of one animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTiming {
    pub duration: Duration,
    pub step: Duration,
}

impl Default for ProgressTiming {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(500),
            step: Duration::from_millis(20),
        }
    }
}

impl ProgressTiming {
    /// Number of frames an animation spans; never zero.
    pub fn steps(&self) -> u32 {
        let step_ms = self.step.as_millis().max(1);
        let steps = self.duration.as_millis().div_ceil(step_ms);
        u32::try_from(steps).unwrap_or(u32::MAX).max(1)
    }
}

/// A linear interpolation from `start` to `end`, identified by `generation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub generation: u64,
    pub start: u8,
    pub end: u8,
    pub steps: u32,
    pub step_interval: Duration,
}

impl Animation {
    /// Displayed value after `step` frames. The last frame is exactly `end`.
    pub fn value_at(&self, step: u32) -> u8 {
        if step >= self.steps {
            return self.end;
        }
        let start = f64::from(self.start);
        let delta = (f64::from(self.end) - start) / f64::from(self.steps);
        let value = (start + delta * f64::from(step)).round();
        value.clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCommand {
    /// Display jumped straight to the value; any running animation is void.
    Snap(u8),
    /// Display will follow this animation frame by frame.
    Animate(Animation),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressPresenter {
    timing: ProgressTiming,
    displayed: u8,
    generation: u64,
    active: Option<Animation>,
}

impl ProgressPresenter {
    pub fn new(timing: ProgressTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn displayed(&self) -> u8 {
        self.displayed
    }

    /// True until the running animation's last frame has been applied.
    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// Moves the target. Values above 100 are clamped.
    pub fn set_target(&mut self, target: u8) -> ProgressCommand {
        let target = target.min(100);
        self.generation += 1;
        if target <= self.displayed {
            self.displayed = target;
            self.active = None;
            return ProgressCommand::Snap(target);
        }
        let animation = Animation {
            generation: self.generation,
            start: self.displayed,
            end: target,
            steps: self.timing.steps(),
            step_interval: self.timing.step,
        };
        self.active = Some(animation);
        ProgressCommand::Animate(animation)
    }

    /// Applies one animation frame. Returns the new displayed value, or `None`
    /// when the frame belongs to an animation that has since been replaced.
    pub fn apply_frame(&mut self, generation: u64, step: u32) -> Option<u8> {
        let animation = self.active.filter(|a| a.generation == generation)?;
        self.displayed = animation.value_at(step);
        if step >= animation.steps {
            self.active = None;
        }
        Some(self.displayed)
    }

    /// Back to zero for a new job.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.displayed = 0;
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presenter() -> ProgressPresenter {
        ProgressPresenter::new(ProgressTiming::default())
    }

    fn run_to_end(presenter: &mut ProgressPresenter, animation: Animation) -> Vec<u8> {
        (1..=animation.steps)
            .filter_map(|step| presenter.apply_frame(animation.generation, step))
            .collect()
    }

    #[test]
    fn default_timing_has_twenty_five_steps() {
        assert_eq!(ProgressTiming::default().steps(), 25);
    }

    #[test]
    fn zero_step_does_not_divide_by_zero() {
        let timing = ProgressTiming {
            duration: Duration::from_millis(100),
            step: Duration::ZERO,
        };
        assert_eq!(timing.steps(), 100);
        let instant = ProgressTiming {
            duration: Duration::ZERO,
            step: Duration::from_millis(20),
        };
        assert_eq!(instant.steps(), 1);
    }

    #[test]
    fn lower_or_equal_target_snaps() {
        for current in [0u8, 1, 37, 99, 100] {
            for target in 0..=current {
                let mut p = presenter();
                if current > 0 {
                    if let ProgressCommand::Animate(a) = p.set_target(current) {
                        run_to_end(&mut p, a);
                    }
                }
                assert_eq!(p.displayed(), current);
                assert_eq!(p.set_target(target), ProgressCommand::Snap(target));
                assert_eq!(p.displayed(), target);
                assert!(!p.is_animating());
            }
        }
    }

    #[test]
    fn higher_target_animates_monotonically_to_exact_end() {
        for start in [0u8, 3, 10, 55, 98] {
            for end in (start + 1)..=100 {
                let mut p = presenter();
                if start > 0 {
                    if let ProgressCommand::Animate(a) = p.set_target(start) {
                        run_to_end(&mut p, a);
                    }
                }
                let ProgressCommand::Animate(animation) = p.set_target(end) else {
                    panic!("expected animation from {start} to {end}");
                };
                assert!(p.is_animating());
                let frames = run_to_end(&mut p, animation);
                assert!(!p.is_animating());
                assert_eq!(frames.len() as u32, animation.steps);
                assert!(frames.windows(2).all(|w| w[0] <= w[1]), "{frames:?}");
                assert!(frames.iter().all(|v| *v >= start && *v <= end));
                assert_eq!(*frames.last().unwrap(), end);
                assert_eq!(p.displayed(), end);
            }
        }
    }

    #[test]
    fn frames_match_applied_values() {
        let mut p = presenter();
        let ProgressCommand::Animate(animation) = p.set_target(55) else {
            panic!("expected animation");
        };
        let expected: Vec<u8> = (1..=animation.steps)
            .map(|step| animation.value_at(step))
            .collect();
        assert_eq!(run_to_end(&mut p, animation), expected);
    }

    #[test]
    fn new_target_mid_animation_restarts_from_displayed() {
        let mut p = presenter();
        let ProgressCommand::Animate(first) = p.set_target(50) else {
            panic!("expected animation");
        };
        for step in 1..=10 {
            p.apply_frame(first.generation, step);
        }
        let midway = p.displayed();
        assert_eq!(midway, 20);

        let ProgressCommand::Animate(second) = p.set_target(80) else {
            panic!("expected animation");
        };
        assert_eq!(second.start, midway);
        assert_ne!(second.generation, first.generation);

        // Frames of the cancelled animation no longer move the display.
        assert_eq!(p.apply_frame(first.generation, 11), None);
        assert_eq!(p.displayed(), midway);

        run_to_end(&mut p, second);
        assert_eq!(p.displayed(), 80);
    }

    #[test]
    fn reset_discards_running_animation() {
        let mut p = presenter();
        let ProgressCommand::Animate(animation) = p.set_target(40) else {
            panic!("expected animation");
        };
        p.apply_frame(animation.generation, 5);
        p.reset();
        assert_eq!(p.displayed(), 0);
        assert_eq!(p.apply_frame(animation.generation, 6), None);
        assert_eq!(p.displayed(), 0);
    }

    #[test]
    fn target_above_hundred_is_clamped() {
        let mut p = presenter();
        let ProgressCommand::Animate(animation) = p.set_target(250) else {
            panic!("expected animation");
        };
        assert_eq!(animation.end, 100);
    }
}
