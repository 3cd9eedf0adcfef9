use super::RootCoordinator;
use crate::modeling::{Component, Coupled};
use crate::{DynRef, SimulationError};
use std::any::Any;
use std::time::{Duration, Instant};

/// Pacing strategy of real-time simulations. It maps virtual time advances to
/// wall-clock waits. Successive calls to [`RealTimeClock::wait_until`] receive
/// non-decreasing virtual times.
pub trait RealTimeClock {
    /// Starts the clock at the initial virtual time.
    fn start(&mut self, time_last: f64);

    /// Stops the clock at the final virtual time.
    fn stop(&mut self, time_last: f64);

    /// Blocks until the wall clock reaches the time that corresponds to
    /// `time_next`, then returns `time_next`. Implementations may return an
    /// earlier virtual time if an external event arrives before the deadline;
    /// in that case the event must already be injected into an input port of
    /// `top`, the interface component of the model under simulation.
    fn wait_until(&mut self, time_next: f64, top: &Component) -> Result<f64, SimulationError>;
}

/// Source of asynchronous external events for a real-time clock. The producer
/// (a hardware ISR, an OS callback, another thread) sets a ready flag and
/// deposits a payload; the clock polls the flag while it waits.
pub trait InterruptHandler: DynRef {
    /// Non-blocking, idempotent poll. Returns `true` while a payload is pending.
    fn is_ready(&mut self) -> bool;

    /// Consumes the pending payload. Called at most once per ready edge.
    /// Returns the payload and the ID of the destination input port on the top
    /// model. The payload type must match the message type of that port.
    fn decode(&mut self) -> (Box<dyn Any + Send>, String);
}

/// Real-time clock based on the monotonic [`Instant`] clock. It is suitable
/// for Linux, macOS, and Windows targets.
pub struct SteadyClock {
    /// Last returned virtual time.
    v_time_last: f64,
    /// Wall-clock instant corresponding to `v_time_last`.
    r_time_last: Instant,
    /// Wall-clock instant corresponding to the start of the simulation.
    r_time_start: Instant,
    /// Virtual-to-wall time scale factor (1 means real time).
    time_scale: f64,
    /// Maximum allowed wall-clock overshoot. [`None`] disables the check.
    max_jitter: Option<Duration>,
    /// Handler polled for asynchronous external events (if any).
    handler: Option<Box<dyn InterruptHandler>>,
}

impl SteadyClock {
    pub fn new() -> Self {
        Self {
            v_time_last: 0.,
            r_time_last: Instant::now(),
            r_time_start: Instant::now(),
            time_scale: 1.,
            max_jitter: None,
            handler: None,
        }
    }

    /// Sets the virtual-to-wall time scale factor.
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Sets the maximum allowed wall-clock overshoot. Exceeding it makes
    /// [`RealTimeClock::wait_until`] fail.
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = Some(max_jitter);
        self
    }

    /// Attaches an interrupt handler for asynchronous external events.
    pub fn with_handler(mut self, handler: impl InterruptHandler) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Current wall time rendered as virtual time.
    fn v_time_now(&self, now: Instant) -> f64 {
        (now - self.r_time_start).as_secs_f64() / self.time_scale
    }
}

impl Default for SteadyClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RealTimeClock for SteadyClock {
    fn start(&mut self, time_last: f64) {
        self.v_time_last = time_last;
        self.r_time_last = Instant::now();
        self.r_time_start = self.r_time_last;
    }

    fn stop(&mut self, time_last: f64) {
        self.v_time_last = time_last;
        self.r_time_last = Instant::now();
    }

    fn wait_until(&mut self, time_next: f64, top: &Component) -> Result<f64, SimulationError> {
        let deadline = time_next.is_finite().then(|| {
            let wait = ((time_next - self.v_time_last) * self.time_scale).max(0.);
            self.r_time_last + Duration::from_secs_f64(wait)
        });

        loop {
            let now = Instant::now();
            if let Some(deadline) = deadline {
                if now >= deadline {
                    break;
                }
            }
            match &mut self.handler {
                Some(handler) => {
                    if handler.is_ready() {
                        let (payload, port_id) = handler.decode();
                        inject(top, payload, &port_id)?;
                        tracing::debug!(port = %port_id, "external event injected");
                        self.r_time_last = now;
                        self.v_time_last = self.v_time_now(now).min(time_next);
                        return Ok(self.v_time_last);
                    }
                    // short naps keep CPU consumption low while polling
                    std::thread::sleep(Duration::from_micros(50));
                }
                None => match deadline {
                    Some(deadline) => std::thread::sleep(deadline - now),
                    // passive model and no event source: nothing left to wait for
                    None => return Ok(time_next),
                },
            }
        }

        if let Some(max_jitter) = self.max_jitter {
            // the deadline is always set here: an infinite time_next never breaks the loop
            let jitter = Instant::now() - deadline.unwrap_or(self.r_time_last);
            if jitter > max_jitter {
                tracing::error!(?jitter, "delay jitter is too high");
                return Err(SimulationError::JitterExceeded { jitter, max_jitter });
            }
        }
        if let Some(deadline) = deadline {
            self.r_time_last = deadline;
        }
        self.v_time_last = time_next;
        Ok(time_next)
    }
}

/// Injects a type-erased payload into an input port of the top model.
fn inject(top: &Component, payload: Box<dyn Any + Send>, port_id: &str) -> Result<(), SimulationError> {
    let port = top
        .in_port_handle(port_id)
        .map_err(|_| SimulationError::IncompatiblePort {
            port: port_id.to_string(),
            reason: format!("component {} does not own such an input port", top.get_id()),
        })?;
    port.inject_any(payload)
        .map_err(|_| SimulationError::IncompatiblePort {
            port: port_id.to_string(),
            reason: "payload type does not match the port message type".to_string(),
        })
}

/// Real-time driver: a sequential [`RootCoordinator`] paced by a
/// [`RealTimeClock`]. Before every simulation cycle, the loop waits on the
/// clock and advances to whatever virtual time the clock returns.
pub struct RealTimeRootCoordinator<C: RealTimeClock> {
    root: RootCoordinator,
    clock: C,
}

impl<C: RealTimeClock> RealTimeRootCoordinator<C> {
    /// Creates a new real-time root coordinator with initial time 0.
    pub fn new(model: Coupled, clock: C) -> Self {
        Self {
            root: RootCoordinator::new(model),
            clock,
        }
    }

    /// Attaches a logger to the simulation.
    pub fn set_logger(&mut self, logger: super::SharedLogger) {
        self.root.set_logger(logger);
    }

    /// Returns the interface component of the top coupled model.
    pub fn top_component(&self) -> &Component {
        self.root.top_component()
    }

    /// Returns the time of the last simulation cycle.
    pub fn time_last(&self) -> f64 {
        self.root.time_last()
    }

    /// Starts the root coordinator and the real-time clock.
    pub fn start(&mut self) {
        self.root.start();
        self.clock.start(self.root.time_last());
    }

    /// Stops the real-time clock and the root coordinator.
    pub fn stop(&mut self) {
        self.clock.stop(self.root.time_last());
        self.root.stop();
    }

    /// Runs the simulation for a given period of virtual time, paced by the
    /// clock. When the clock returns early because of an external event, the
    /// cycle runs at the returned time and the injected messages trigger the
    /// corresponding external transitions.
    pub fn simulate_time(&mut self, time_interval: f64) -> Result<(), SimulationError> {
        let time_final = self.root.time_last() + time_interval;
        let mut time_next = self.root.time_next();
        while time_next < time_final {
            let time = self
                .clock
                .wait_until(time_next, self.root.top_component())?;
            self.root.simulation_advance(time)?;
            time_next = self.root.time_next();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::{Atomic, InPort, OutPort};
    use crate::shared_cell;
    use crate::simulation::MemoryLogger;
    use crate::with_cell;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Forwards every received value after a fixed delay.
    struct Echo {
        component: Component,
        sigma: f64,
        delay: f64,
        pending: Vec<i32>,
        input: InPort<i32>,
        output: OutPort<i32>,
    }

    impl Echo {
        fn new(id: &str, delay: f64) -> Self {
            let mut component = Component::new(id);
            let input = component.add_in_port("input").unwrap();
            let output = component.add_out_port("output").unwrap();
            Self {
                component,
                sigma: f64::INFINITY,
                delay,
                pending: Vec::new(),
                input,
                output,
            }
        }
    }

    impl Atomic for Echo {
        fn get_component(&self) -> &Component {
            &self.component
        }
        fn get_component_mut(&mut self) -> &mut Component {
            &mut self.component
        }
        fn lambda(&self) {
            // Safety: adding messages on the model's output port at lambda
            unsafe { self.output.add_values(&self.pending) };
        }
        fn delta_int(&mut self) {
            self.pending.clear();
            self.sigma = f64::INFINITY;
        }
        fn delta_ext(&mut self, e: f64) {
            self.sigma -= e;
            // Safety: reading messages on the model's input port at delta_ext
            let received = unsafe { self.input.get_values() };
            if !received.is_empty() {
                self.pending.extend_from_slice(received);
                self.sigma = self.delay;
            }
        }
        fn ta(&self) -> f64 {
            self.sigma
        }
    }

    /// Keeps virtual time flowing with one internal event per period.
    struct Heartbeat {
        component: Component,
        period: f64,
    }

    impl Heartbeat {
        fn new(id: &str, period: f64) -> Self {
            Self {
                component: Component::new(id),
                period,
            }
        }
    }

    impl Atomic for Heartbeat {
        fn get_component(&self) -> &Component {
            &self.component
        }
        fn get_component_mut(&mut self) -> &mut Component {
            &mut self.component
        }
        fn lambda(&self) {}
        fn delta_int(&mut self) {}
        fn delta_ext(&mut self, _e: f64) {}
        fn ta(&self) -> f64 {
            self.period
        }
    }

    fn echo_model(delay: f64) -> Coupled {
        let mut top = Coupled::new("top");
        top.add_in_port::<i32>("input").unwrap();
        top.add_out_port::<i32>("output").unwrap();
        top.add_component(Echo::new("echo", delay)).unwrap();
        top.add_component(Heartbeat::new("heartbeat", 1.)).unwrap();
        top.add_eic("input", "echo", "input").unwrap();
        top.add_eoc("echo", "output", "output").unwrap();
        top
    }

    /// Fires exactly once, as soon as the clock polls it.
    struct OneShot {
        fired: Arc<AtomicBool>,
        payload: i32,
        port: String,
    }

    impl InterruptHandler for OneShot {
        fn is_ready(&mut self) -> bool {
            !self.fired.load(Ordering::SeqCst)
        }
        fn decode(&mut self) -> (Box<dyn Any + Send>, String) {
            self.fired.store(true, Ordering::SeqCst);
            (Box::new(self.payload), self.port.clone())
        }
    }

    #[test]
    fn test_paced_wait() {
        // 1 virtual second corresponds to 20 wall milliseconds
        let clock = SteadyClock::new().with_time_scale(0.02);
        let mut root = RealTimeRootCoordinator::new(echo_model(1.), clock);
        root.start();
        let wall = std::time::Instant::now();
        root.simulate_time(5.).unwrap();
        root.stop();
        let elapsed = wall.elapsed();
        assert!(elapsed >= Duration::from_millis(80), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
    }

    #[test]
    fn test_jitter_exceeded() {
        let clock = SteadyClock::new()
            .with_time_scale(0.001)
            .with_max_jitter(Duration::ZERO);
        let mut root = RealTimeRootCoordinator::new(echo_model(1.), clock);
        root.start();
        assert!(matches!(
            root.simulate_time(10.),
            Err(SimulationError::JitterExceeded { .. })
        ));
    }

    #[test]
    fn test_interrupt_injection() {
        let handler = OneShot {
            fired: Arc::new(AtomicBool::new(false)),
            payload: 17,
            port: "input".to_string(),
        };
        let clock = SteadyClock::new()
            .with_time_scale(0.001)
            .with_handler(handler);

        let log = shared_cell(MemoryLogger::new());
        let mut root = RealTimeRootCoordinator::new(echo_model(1.), clock);
        root.set_logger(log.clone());
        root.start();
        root.simulate_time(10.).unwrap();
        root.stop();

        // the injected 17 went through the echo model
        let outputs = with_cell(&log, |log| log.outputs.clone());
        assert_eq!(1, outputs.len());
        assert_eq!("17", outputs[0].message);
        assert_eq!("echo", outputs[0].model_name);
    }

    #[test]
    fn test_unknown_interrupt_port() {
        let handler = OneShot {
            fired: Arc::new(AtomicBool::new(false)),
            payload: 17,
            port: "bad_port".to_string(),
        };
        let clock = SteadyClock::new()
            .with_time_scale(0.001)
            .with_handler(handler);
        let mut root = RealTimeRootCoordinator::new(echo_model(1.), clock);
        root.start();
        assert!(matches!(
            root.simulate_time(10.),
            Err(SimulationError::IncompatiblePort { .. })
        ));
    }

    #[test]
    fn test_incompatible_interrupt_payload() {
        struct BadPayload(Arc<AtomicBool>);
        impl InterruptHandler for BadPayload {
            fn is_ready(&mut self) -> bool {
                !self.0.load(Ordering::SeqCst)
            }
            fn decode(&mut self) -> (Box<dyn Any + Send>, String) {
                self.0.store(true, Ordering::SeqCst);
                (Box::new("not an i32".to_string()), "input".to_string())
            }
        }
        let clock = SteadyClock::new()
            .with_time_scale(0.001)
            .with_handler(BadPayload(Arc::new(AtomicBool::new(false))));
        let mut root = RealTimeRootCoordinator::new(echo_model(1.), clock);
        root.start();
        assert!(matches!(
            root.simulate_time(10.),
            Err(SimulationError::IncompatiblePort { .. })
        ));
    }
}
