//! Phased system scheduler.
//!
//! Tick phases run once per fixed step in the order of [`Phase::TICK_ORDER`];
//! [`Phase::Present`] runs once per rendered frame. Inside a phase, systems
//! run in ascending priority with ties kept in registration order.

use std::fmt;
use thiserror::Error;
use warren_metrics::{SystemProfiler, SystemTiming};

/// Maximum number of systems per phase.
pub const MAX_SYSTEMS_PER_PHASE: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Input,
    SimPre,
    Physics,
    SimPost,
    Debug,
    Present,
}

impl Phase {
    pub const TICK_ORDER: [Phase; 5] = [
        Phase::Input,
        Phase::SimPre,
        Phase::Physics,
        Phase::SimPost,
        Phase::Debug,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Input => "input",
            Phase::SimPre => "sim_pre",
            Phase::Physics => "physics",
            Phase::SimPost => "sim_post",
            Phase::Debug => "debug",
            Phase::Present => "present",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable identifier for a registered system.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// Errors that can occur while registering a system.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered in phase {phase}")]
    DuplicateName { name: String, phase: Phase },

    #[error("phase {phase} is full (64 systems), cannot add '{name}'")]
    PhaseFull { name: String, phase: Phase },

    #[error("system '{name}' cannot run per tick in phase {phase}")]
    WrongPhase { name: String, phase: Phase },
}

/// Per-tick callback: state, fixed delta seconds, input snapshot.
pub type TickSystem<S, I> = Box<dyn FnMut(&mut S, f32, &I)>;

/// Per-frame callback: state, frame delta seconds.
pub type PresentSystem<S> = Box<dyn FnMut(&mut S, f32)>;

struct Entry<F> {
    name: String,
    /// Profiler key, `phase/name`.
    timing_key: String,
    priority: i32,
    handle: SystemHandle,
    run: F,
}

fn timing_key(phase: Phase, name: &str) -> String {
    format!("{phase}/{name}")
}

fn insert_sorted<F>(
    list: &mut Vec<Entry<F>>,
    phase: Phase,
    entry: Entry<F>,
) -> Result<SystemHandle, SystemRegistrationError> {
    if list.iter().any(|e| e.name == entry.name) {
        return Err(SystemRegistrationError::DuplicateName {
            name: entry.name,
            phase,
        });
    }
    if list.len() >= MAX_SYSTEMS_PER_PHASE {
        return Err(SystemRegistrationError::PhaseFull {
            name: entry.name,
            phase,
        });
    }
    // After every entry with priority <= ours, so ties keep registration order.
    let at = list.partition_point(|e| e.priority <= entry.priority);
    let handle = entry.handle;
    tracing::debug!(system = %entry.name, %phase, priority = entry.priority, "registered system");
    list.insert(at, entry);
    Ok(handle)
}

/// Ordered registry of systems over a state `S` and input snapshot `I`.
pub struct Scheduler<S, I> {
    tick: [Vec<Entry<TickSystem<S, I>>>; 5],
    present: Vec<Entry<PresentSystem<S>>>,
    next_handle: u32,
    profiler: SystemProfiler,
}

impl<S, I> Scheduler<S, I> {
    pub fn new() -> Self {
        Self {
            tick: Default::default(),
            present: Vec::new(),
            next_handle: 0,
            profiler: SystemProfiler::new(),
        }
    }

    fn allocate_handle(&mut self) -> SystemHandle {
        let handle = SystemHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Register a per-tick system. `Phase::Present` is rejected; use
    /// [`register_present`](Self::register_present).
    pub fn register<F>(
        &mut self,
        phase: Phase,
        priority: i32,
        name: &str,
        system: F,
    ) -> Result<SystemHandle, SystemRegistrationError>
    where
        F: FnMut(&mut S, f32, &I) + 'static,
    {
        if phase == Phase::Present {
            return Err(SystemRegistrationError::WrongPhase {
                name: name.to_string(),
                phase,
            });
        }
        let entry = Entry {
            name: name.to_string(),
            timing_key: timing_key(phase, name),
            priority,
            handle: self.allocate_handle(),
            run: Box::new(system) as TickSystem<S, I>,
        };
        insert_sorted(&mut self.tick[phase.slot()], phase, entry)
    }

    pub fn register_present<F>(
        &mut self,
        priority: i32,
        name: &str,
        system: F,
    ) -> Result<SystemHandle, SystemRegistrationError>
    where
        F: FnMut(&mut S, f32) + 'static,
    {
        let entry = Entry {
            name: name.to_string(),
            timing_key: timing_key(Phase::Present, name),
            priority,
            handle: self.allocate_handle(),
            run: Box::new(system) as PresentSystem<S>,
        };
        insert_sorted(&mut self.present, Phase::Present, entry)
    }

    /// Run one fixed tick: every tick phase in order.
    pub fn run_tick(&mut self, state: &mut S, dt: f32, input: &I) {
        for phase in Phase::TICK_ORDER {
            for entry in self.tick[phase.slot()].iter_mut() {
                let run = &mut entry.run;
                self.profiler.time_system(&entry.timing_key, || run(&mut *state, dt, input));
            }
        }
    }

    /// Run the present phase once for a rendered frame.
    pub fn run_present(&mut self, state: &mut S, dt: f32) {
        for entry in self.present.iter_mut() {
            let run = &mut entry.run;
            self.profiler.time_system(&entry.timing_key, || run(&mut *state, dt));
        }
    }

    /// Execution order of a phase as `(name, priority)` pairs.
    pub fn systems(&self, phase: Phase) -> Vec<(&str, i32)> {
        if phase == Phase::Present {
            self.present.iter().map(|e| (e.name.as_str(), e.priority)).collect()
        } else {
            self.tick[phase.slot()]
                .iter()
                .map(|e| (e.name.as_str(), e.priority))
                .collect()
        }
    }

    pub fn handle_of(&self, phase: Phase, name: &str) -> Option<SystemHandle> {
        if phase == Phase::Present {
            self.present.iter().find(|e| e.name == name).map(|e| e.handle)
        } else {
            self.tick[phase.slot()].iter().find(|e| e.name == name).map(|e| e.handle)
        }
    }

    /// Profiler entries are keyed `phase/name`.
    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn timing(&self, phase: Phase, name: &str) -> Option<SystemTiming> {
        self.profiler.timing(&timing_key(phase, name))
    }
}

impl<S, I> Default for Scheduler<S, I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    fn logger(tag: &'static str) -> impl FnMut(&mut Log, f32, &()) {
        move |log: &mut Log, _dt, _input| log.push(tag.to_string())
    }

    #[test]
    fn phases_run_in_global_order() {
        let mut sched: Scheduler<Log, ()> = Scheduler::new();
        sched.register(Phase::Debug, 0, "debug", logger("debug")).unwrap();
        sched.register(Phase::SimPost, 0, "post", logger("post")).unwrap();
        sched.register(Phase::Input, 0, "input", logger("input")).unwrap();
        sched.register(Phase::Physics, 0, "physics", logger("physics")).unwrap();
        sched.register(Phase::SimPre, 0, "pre", logger("pre")).unwrap();

        let mut log = Log::new();
        sched.run_tick(&mut log, 1.0 / 60.0, &());
        assert_eq!(log, vec!["input", "pre", "physics", "post", "debug"]);
    }

    #[test]
    fn priority_ties_keep_registration_order() {
        let mut sched: Scheduler<Log, ()> = Scheduler::new();
        sched.register(Phase::SimPost, 200, "c", logger("c")).unwrap();
        sched.register(Phase::SimPost, 100, "a", logger("a")).unwrap();
        sched.register(Phase::SimPost, 200, "d", logger("d")).unwrap();
        sched.register(Phase::SimPost, 100, "b", logger("b")).unwrap();
        sched.register(Phase::SimPost, -5, "first", logger("first")).unwrap();

        let order: Vec<_> = sched.systems(Phase::SimPost).into_iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["first", "a", "b", "c", "d"]);

        let mut log = Log::new();
        sched.run_tick(&mut log, 0.0, &());
        assert_eq!(log, vec!["first", "a", "b", "c", "d"]);
    }

    #[test]
    fn present_runs_separately_and_receives_dt() {
        let mut sched: Scheduler<Vec<f32>, ()> = Scheduler::new();
        sched
            .register(Phase::Input, 0, "tick", |s: &mut Vec<f32>, dt, _: &()| s.push(dt))
            .unwrap();
        sched
            .register_present(10, "frame", |s: &mut Vec<f32>, dt| s.push(-dt))
            .unwrap();

        let mut seen = Vec::new();
        sched.run_present(&mut seen, 0.5);
        assert_eq!(seen, vec![-0.5]);
        sched.run_tick(&mut seen, 0.25, &());
        assert_eq!(seen, vec![-0.5, 0.25]);
    }

    #[test]
    fn registration_errors() {
        let mut sched: Scheduler<Log, ()> = Scheduler::new();
        sched.register(Phase::Input, 0, "input", logger("x")).unwrap();

        let dup = sched.register(Phase::Input, 5, "input", logger("y"));
        assert!(matches!(dup, Err(SystemRegistrationError::DuplicateName { .. })));

        // Same name in another phase is fine.
        assert!(sched.register(Phase::Debug, 0, "input", logger("z")).is_ok());

        let wrong = sched.register(Phase::Present, 0, "frame", logger("w"));
        assert!(matches!(wrong, Err(SystemRegistrationError::WrongPhase { .. })));

        for i in 1..MAX_SYSTEMS_PER_PHASE {
            sched.register(Phase::Input, 0, &format!("s{i}"), logger("s")).unwrap();
        }
        let full = sched.register(Phase::Input, 0, "overflow", logger("o"));
        assert!(matches!(full, Err(SystemRegistrationError::PhaseFull { .. })));
        assert_eq!(sched.systems(Phase::Input).len(), MAX_SYSTEMS_PER_PHASE);
    }

    #[test]
    fn handles_are_unique() {
        let mut sched: Scheduler<Log, ()> = Scheduler::new();
        let a = sched.register(Phase::Input, 0, "a", logger("a")).unwrap();
        let b = sched.register_present(0, "b", |_: &mut Log, _| {}).unwrap();
        assert_ne!(a, b);
        assert_eq!(sched.handle_of(Phase::Present, "b"), Some(b));
        assert_eq!(a.to_string(), "system#0");
    }

    #[test]
    #[cfg(feature = "metrics")]
    fn timings_are_kept_per_phase() {
        let mut sched: Scheduler<Log, ()> = Scheduler::new();
        sched.register(Phase::Input, 0, "stats", logger("a")).unwrap();
        sched.register(Phase::Debug, 0, "stats", logger("b")).unwrap();
        sched.register_present(0, "stats", |_: &mut Log, _| {}).unwrap();

        let mut log = Log::new();
        sched.run_tick(&mut log, 0.0, &());
        sched.run_tick(&mut log, 0.0, &());
        sched.run_present(&mut log, 0.0);

        assert_eq!(sched.timing(Phase::Input, "stats").unwrap().calls, 2);
        assert_eq!(sched.timing(Phase::Debug, "stats").unwrap().calls, 2);
        assert_eq!(sched.timing(Phase::Present, "stats").unwrap().calls, 1);
        assert!(sched.timing(Phase::Physics, "stats").is_none());
        assert!(sched.profiler().timing("debug/stats").is_some());
    }
}
