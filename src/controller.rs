//! Simulation lifecycle: project description plus the run worker.
//!
//! A [`SimulationController`] owns one background worker at a time. All
//! circuit mutation happens on that worker; the controller thread only
//! flips atomics and the step gate, so run, pause, step and stop are safe
//! to call from any thread at any time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::bridge::PinStateEvent;
use crate::circuit::Circuit;
use crate::components::ComponentDescriptor;
use crate::error::Result;
use crate::solver::{StepOutcome, Transient, TransientConfig};

/// Lock a mutex, recovering the guard if a worker panicked mid-hold.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A simulation project: the components to build and the run parameters.
#[derive(Debug, Clone, Default)]
pub struct SimulationProject {
    pub name: String,
    pub components: Vec<ComponentDescriptor>,
    pub config: TransientConfig,
}

impl SimulationProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            config: TransientConfig::default(),
        }
    }

    pub fn add_component(mut self, component: ComponentDescriptor) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_config(mut self, config: TransientConfig) -> Self {
        self.config = config;
        self
    }
}

/// Read-only voltage lookup handed to observers during a step callback.
pub trait VoltageProbe {
    /// Solved ground-referenced voltage of a named node.
    fn voltage(&self, node: &str) -> Option<f64>;
}

struct ProbeView<'a> {
    tran: &'a Transient,
    circuit: &'a Circuit,
}

impl VoltageProbe for ProbeView<'_> {
    fn voltage(&self, node: &str) -> Option<f64> {
        self.tran.voltage(self.circuit, node)
    }
}

/// Called by the worker after every settled step.
pub trait StepObserver: Send {
    fn on_step(&mut self, time: f64, voltages: &dyn VoltageProbe);
}

impl<F> StepObserver for F
where
    F: FnMut(f64, &dyn VoltageProbe) + Send,
{
    fn on_step(&mut self, time: f64, voltages: &dyn VoltageProbe) {
        self(time, voltages)
    }
}

/// One-permit gate the worker parks on while paused.
///
/// `release` grants a single pass; `wait` consumes it. Draining before a
/// worker spawns guarantees a step from the stopped state runs exactly one
/// iteration.
struct StepGate {
    permit: Mutex<bool>,
    signal: Condvar,
}

impl StepGate {
    fn new() -> Self {
        Self {
            permit: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    fn release(&self) {
        *lock(&self.permit) = true;
        self.signal.notify_one();
    }

    fn drain(&self) {
        *lock(&self.permit) = false;
    }

    fn wait(&self) {
        let mut permit = lock(&self.permit);
        while !*permit {
            permit = self
                .signal
                .wait(permit)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *permit = false;
    }
}

/// Control state shared between the controller and its worker.
struct Shared {
    paused: AtomicBool,
    stop: AtomicBool,
    running: Mutex<bool>,
    gate: StepGate,
}

type ObserverSlot = Arc<Mutex<Option<Box<dyn StepObserver>>>>;

/// Owns the worker thread that advances a project's transient analysis.
pub struct SimulationController {
    project: SimulationProject,
    shared: Arc<Shared>,
    observer: ObserverSlot,
    events_tx: Sender<PinStateEvent>,
    events_rx: Option<Receiver<PinStateEvent>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SimulationController {
    pub fn new(project: SimulationProject) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            project,
            shared: Arc::new(Shared {
                paused: AtomicBool::new(false),
                stop: AtomicBool::new(false),
                running: Mutex::new(false),
                gate: StepGate::new(),
            }),
            observer: Arc::new(Mutex::new(None)),
            events_tx,
            events_rx: Some(events_rx),
            worker: Mutex::new(None),
        }
    }

    /// Install the step observer, replacing any previous one.
    pub fn set_observer(&self, observer: impl StepObserver + 'static) {
        *lock(&self.observer) = Some(Box::new(observer));
    }

    /// Take the receiving end of the pin-event channel. Yields `Some` once.
    pub fn take_pin_events(&mut self) -> Option<Receiver<PinStateEvent>> {
        self.events_rx.take()
    }

    /// Start, or resume from pause, free-running simulation.
    ///
    /// The gate permit is only granted when this call actually clears the
    /// paused flag; a redundant start on a free-running worker must not
    /// bank a permit that a later pause would spend on an extra step.
    pub fn start(&self) -> Result<()> {
        if self.shared.paused.swap(false, Ordering::SeqCst) {
            self.shared.gate.release();
        }
        self.begin_run()
    }

    /// Pause a free-running simulation at the next step boundary.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    /// Advance exactly one step, then hold paused.
    pub fn step(&self) -> Result<()> {
        self.shared.paused.store(true, Ordering::SeqCst);
        self.shared.gate.release();
        self.begin_run()
    }

    /// Stop the current run. The worker exits at its next control check.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.gate.release();
    }

    /// Whether a worker is currently alive.
    pub fn is_running(&self) -> bool {
        *lock(&self.shared.running)
    }

    /// Block until the current worker exits.
    pub fn wait(&self) {
        if let Some(handle) = lock(&self.worker).take() {
            let _ = handle.join();
        }
    }

    /// Build the circuit and spawn the worker, unless one is already alive.
    ///
    /// Construction failures surface here, on the caller's thread, before
    /// anything is spawned.
    fn begin_run(&self) -> Result<()> {
        let mut running = lock(&self.shared.running);
        if *running {
            return Ok(());
        }

        let mut circuit = Circuit::build(&self.project.components, &self.events_tx)?;
        let mut tran = Transient::new(&circuit, self.project.config.clone());

        // A permit released before this run belongs to the previous run;
        // the first iteration after spawn needs none.
        self.shared.gate.drain();
        self.shared.stop.store(false, Ordering::SeqCst);
        *running = true;
        drop(running);

        log::info!(target: "cosim::controller", "starting run of '{}'", self.project.name);

        let shared = Arc::clone(&self.shared);
        let observer = Arc::clone(&self.observer);
        let handle = thread::spawn(move || {
            run_worker(&mut circuit, &mut tran, &shared, &observer);
            *lock(&shared.running) = false;
        });
        *lock(&self.worker) = Some(handle);
        Ok(())
    }
}

impl Drop for SimulationController {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

fn run_worker(circuit: &mut Circuit, tran: &mut Transient, shared: &Shared, observer: &ObserverSlot) {
    'run: loop {
        tran.begin();
        loop {
            if shared.stop.load(Ordering::SeqCst) {
                break 'run;
            }
            match tran.advance(circuit) {
                Ok(StepOutcome::Complete) => break,
                Ok(StepOutcome::Advanced) => {
                    if let Some(obs) = lock(observer).as_mut() {
                        let probe = ProbeView { tran, circuit };
                        obs.on_step(tran.time(), &probe);
                    }
                    thread::sleep(tran.config().step_delay);
                    if shared.paused.load(Ordering::SeqCst) && !shared.stop.load(Ordering::SeqCst) {
                        shared.gate.wait();
                    }
                }
                Err(e) => {
                    log::error!(target: "cosim::controller", "run aborted at t={:.3e}: {}", tran.time(), e);
                    break 'run;
                }
            }
        }
        if !tran.config().loop_enabled {
            break;
        }
    }
    log::info!(
        target: "cosim::controller",
        "run finished after {} steps (t={:.3e})",
        tran.steps(),
        tran.time()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Pulse;
    use crate::error::CosimError;
    use crate::routine::LogicSource;
    use std::time::Duration;

    fn fast_project(final_time: f64) -> SimulationProject {
        SimulationProject::new("test")
            .add_component(ComponentDescriptor::clock(
                "CLK",
                "clk",
                Pulse::square(20_000.0, 0.0, 5.0),
            ))
            .add_component(ComponentDescriptor::logic(
                "U1",
                vec!["clk".into()],
                vec!["q".into()],
                "0",
                LogicSource::Inline("out[0] = !in[0]".into()),
            ))
            .with_config(
                TransientConfig::default()
                    .with_final_time(final_time)
                    .with_step_delay(Duration::ZERO),
            )
    }

    fn observed(controller: &SimulationController) -> Receiver<f64> {
        let (tx, rx) = mpsc::channel();
        controller.set_observer(move |time: f64, _: &dyn VoltageProbe| {
            let _ = tx.send(time);
        });
        rx
    }

    #[test]
    fn test_step_advances_exactly_one_iteration() {
        let controller = SimulationController::new(fast_project(200e-6));
        let steps = observed(&controller);

        controller.step().unwrap();
        let first = steps.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!((first - 1e-7).abs() < 1e-12);
        // No second step arrives while held paused.
        assert!(steps.recv_timeout(Duration::from_millis(200)).is_err());

        controller.step().unwrap();
        let second = steps.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!((second - 2e-7).abs() < 1e-12);
        assert!(steps.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_run_to_completion() {
        let controller = SimulationController::new(fast_project(5e-7));
        let steps = observed(&controller);

        controller.start().unwrap();
        controller.wait();

        let times: Vec<f64> = steps.try_iter().collect();
        assert_eq!(times.len(), 5);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_while_paused() {
        let controller = SimulationController::new(fast_project(200e-6));
        let steps = observed(&controller);

        controller.step().unwrap();
        steps.recv_timeout(Duration::from_secs(2)).unwrap();

        controller.stop();
        controller.wait();
        assert!(!controller.is_running());
    }

    #[test]
    fn test_resume_after_pause() {
        let controller = SimulationController::new(fast_project(200e-6));
        let steps = observed(&controller);

        controller.step().unwrap();
        steps.recv_timeout(Duration::from_secs(2)).unwrap();

        // Resuming the same run keeps advancing from where it paused.
        controller.start().unwrap();
        let resumed = steps.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(resumed > 1e-7);

        controller.stop();
        controller.wait();
    }

    #[test]
    fn test_redundant_start_does_not_bank_a_permit() {
        let mut project = fast_project(200e-6);
        project.config.step_delay = Duration::from_millis(150);
        let controller = SimulationController::new(project);
        let steps = observed(&controller);

        controller.start().unwrap();
        steps.recv_timeout(Duration::from_secs(2)).unwrap();

        // A second start while free-running, then a pause during the
        // inter-step sleep: the worker must park at the next boundary
        // without spending a stale permit on an extra step.
        controller.start().unwrap();
        controller.pause();
        assert!(steps.recv_timeout(Duration::from_millis(600)).is_err());

        controller.stop();
        controller.wait();
    }

    #[test]
    fn test_empty_project_fails_before_spawn() {
        let controller = SimulationController::new(SimulationProject::new("empty"));
        let err = controller.start().unwrap_err();
        assert!(matches!(err, CosimError::NoComponents));
        assert!(!controller.is_running());
    }

    #[test]
    fn test_looped_run_restarts() {
        let mut project = fast_project(3e-7);
        project.config.loop_enabled = true;
        let controller = SimulationController::new(project);
        let steps = observed(&controller);

        controller.start().unwrap();
        // More steps than one pass holds means the run wrapped around.
        for _ in 0..7 {
            steps.recv_timeout(Duration::from_secs(2)).unwrap();
        }
        controller.stop();
        controller.wait();
    }

    #[test]
    fn test_pin_events_delivered() {
        let mut controller = SimulationController::new(fast_project(200e-6));
        let events = controller.take_pin_events().unwrap();
        assert!(controller.take_pin_events().is_none());

        controller.step().unwrap();
        let event = events.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(&*event.component, "U1");

        controller.stop();
        controller.wait();
    }
}
