use super::SharedProbe;
use crate::modeling::{Atomic, Component, InPort, OutPort};
use crate::{with_cell, ModelError};
#[cfg(feature = "devstone_busy")]
use cpu_time::ThreadTime;
use std::time::Duration;

pub(super) struct DEVStoneAtomic {
    component: Component,
    input: InPort<usize>,
    output: OutPort<usize>,
    int_delay: Option<Duration>,
    ext_delay: Option<Duration>,
    n_internals: usize,
    n_externals: usize,
    n_events: usize,
    probe: Option<SharedProbe>,
    sigma: f64,
}

impl DEVStoneAtomic {
    pub(super) fn new(
        name: &str,
        int_delay: u64,
        ext_delay: u64,
        probe: Option<SharedProbe>,
    ) -> Result<Self, ModelError> {
        let mut component = Component::new(name);
        let input = component.add_in_port("input")?;
        let output = component.add_out_port("output")?;
        if let Some(probe) = &probe {
            with_cell(probe, |probe| probe.n_atomics += 1);
        }
        Ok(Self {
            component,
            input,
            output,
            int_delay: (int_delay > 0).then(|| Duration::from_millis(int_delay)),
            ext_delay: (ext_delay > 0).then(|| Duration::from_millis(ext_delay)),
            n_internals: 0,
            n_externals: 0,
            n_events: 0,
            probe,
            sigma: f64::INFINITY,
        })
    }

    /// Burns CPU time for the configured transition delay.
    #[inline]
    fn sleep(duration: &Option<Duration>) {
        if let Some(duration) = duration {
            #[cfg(feature = "devstone_busy")]
            {
                let now = ThreadTime::now();
                let mut x: u32 = 0;
                while now.elapsed() < *duration {
                    std::hint::black_box(&mut x);
                    x = x.wrapping_add(1);
                }
            }
            #[cfg(not(feature = "devstone_busy"))]
            std::thread::sleep(*duration);
        }
    }
}

impl Atomic for DEVStoneAtomic {
    #[inline]
    fn get_component(&self) -> &Component {
        &self.component
    }

    #[inline]
    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn stop(&mut self) {
        if let Some(probe) = &self.probe {
            with_cell(probe, |probe| {
                probe.n_internals += self.n_internals;
                probe.n_externals += self.n_externals;
                probe.n_events += self.n_events;
            });
        }
    }

    #[inline]
    fn lambda(&self) {
        // Safety: adding messages on the model's output port at lambda
        unsafe { self.output.add_value(self.n_events) };
    }

    #[inline]
    fn delta_int(&mut self) {
        self.n_internals += 1;
        self.sigma = f64::INFINITY;
        Self::sleep(&self.int_delay);
    }

    fn delta_ext(&mut self, _e: f64) {
        self.n_externals += 1;
        // Safety: reading messages on the model's input port at delta_ext
        self.n_events += unsafe { self.input.get_values() }.len();
        self.sigma = 0.;
        Self::sleep(&self.ext_delay);
    }

    #[inline]
    fn ta(&self) -> f64 {
        self.sigma
    }
}
