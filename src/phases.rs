//! Per-rank named phase timing.
//!
//! Phases measure the wall-clock cost of pipeline stages (scattering, local
//! sorting, merging, gathering). A phase can be stopped and later resumed to
//! accumulate time across disjoint intervals, which lets an algorithm charge
//! only its computation, not the communication in between, to one phase.

use std::time::{Duration, Instant};

/// Index of a phase within its [`PhaseTimer`].
pub type PhaseHandle = usize;

#[derive(Debug, Clone)]
struct Phase {
    name: String,
    elapsed: Duration,
    started: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct PhaseTimer {
    phases: Vec<Phase>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: &str) -> PhaseHandle {
        self.phases.push(Phase {
            name: name.to_string(),
            elapsed: Duration::ZERO,
            started: Some(Instant::now()),
        });
        self.phases.len() - 1
    }

    pub fn stop(&mut self, handle: PhaseHandle) {
        let phase = &mut self.phases[handle];
        let started = phase
            .started
            .take()
            .unwrap_or_else(|| panic!("phase \"{}\" stopped while not running", phase.name));
        phase.elapsed += started.elapsed();
    }

    pub fn resume(&mut self, handle: PhaseHandle) {
        let phase = &mut self.phases[handle];
        assert!(
            phase.started.is_none(),
            "phase \"{}\" resumed while running",
            phase.name
        );
        phase.started = Some(Instant::now());
    }

    /// Finished phases with their accumulated durations, in start order.
    pub fn report(&self) -> Vec<(String, Duration)> {
        self.phases
            .iter()
            .map(|p| {
                debug_assert!(p.started.is_none(), "phase \"{}\" never stopped", p.name);
                (p.name.clone(), p.elapsed)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::PhaseTimer;
    use std::time::Duration;

    #[test]
    fn stop_then_resume_accumulates() {
        let mut t = PhaseTimer::new();
        let a = t.start("a");
        t.stop(a);
        t.resume(a);
        std::thread::sleep(Duration::from_millis(5));
        t.stop(a);

        let report = t.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].0, "a");
        assert!(report[0].1 >= Duration::from_millis(5));
    }

    #[test]
    fn phases_report_in_start_order() {
        let mut t = PhaseTimer::new();
        let a = t.start("scattering");
        t.stop(a);
        let b = t.start("sorting");
        t.stop(b);
        let names: Vec<_> = t.report().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["scattering", "sorting"]);
    }
}
