//! Generator-Processor-Transducer (GPT) model suite, including the nested
//! experimental-frame arrangement (EF and EFP).

use crate::modeling::{Atomic, BigOutPort, Component, Coupled, InPort, OutPort};
use crate::{ModelError, Shared};
use std::fmt::{Display, Formatter};

/// Job message. Generators create jobs and processors process them.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Job ID number.
    pub id: usize,
    /// Time at which the job was created.
    pub time_generated: f64,
    /// Time at which the job was processed. Negative until processed.
    pub time_processed: f64,
}

impl Job {
    /// Creates a new (not yet processed) job.
    pub fn new(id: usize, time_generated: f64) -> Self {
        Self {
            id,
            time_generated,
            time_processed: -1.,
        }
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{},{},{}}}",
            self.id, self.time_generated, self.time_processed
        )
    }
}

#[derive(Debug)]
struct GeneratorState {
    clock: f64,
    sigma: f64,
    job_count: usize,
}

impl Display for GeneratorState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.job_count)
    }
}

/// It periodically generates new [`Job`]s until it receives a stop message.
pub struct Generator {
    component: Component,
    job_period: f64,
    state: GeneratorState,
    in_stop: InPort<bool>,
    out_generated: BigOutPort<Job>,
}

impl Generator {
    /// Creates a generator that emits its first job one full period after t = 0.
    pub fn new(id: &str, job_period: f64) -> Result<Self, ModelError> {
        let mut component = Component::new(id);
        let in_stop = component.add_in_port("in_stop")?;
        let out_generated = component.add_out_big_port("out_generated")?;
        Ok(Self {
            component,
            job_period,
            state: GeneratorState {
                clock: 0.,
                sigma: job_period,
                job_count: 0,
            },
            in_stop,
            out_generated,
        })
    }
}

impl Atomic for Generator {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        let job = Job::new(self.state.job_count + 1, self.state.clock + self.state.sigma);
        // Safety: adding messages on the model's output port at lambda
        unsafe { self.out_generated.add_value(job) };
    }

    fn delta_int(&mut self) {
        self.state.clock += self.state.sigma;
        self.state.job_count += 1;
        self.state.sigma = self.job_period;
    }

    fn delta_ext(&mut self, e: f64) {
        self.state.clock += e;
        // Safety: reading messages on the model's input port at delta_ext
        match unsafe { self.in_stop.is_empty() } {
            true => self.state.sigma -= e,
            false => self.state.sigma = f64::INFINITY,
        }
    }

    fn ta(&self) -> f64 {
        self.state.sigma
    }

    fn log_state(&self) -> String {
        self.state.to_string()
    }
}

#[derive(Debug)]
struct ProcessorState {
    clock: f64,
    sigma: f64,
    current_job: Option<Job>,
}

impl Display for ProcessorState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sigma)
    }
}

/// It processes one [`Job`] at a time. While busy, incoming jobs are discarded.
pub struct Processor {
    component: Component,
    processing_time: f64,
    state: ProcessorState,
    in_generated: InPort<Shared<Job>>,
    out_processed: BigOutPort<Job>,
}

impl Processor {
    pub fn new(id: &str, processing_time: f64) -> Result<Self, ModelError> {
        let mut component = Component::new(id);
        let in_generated = component.add_in_big_port("in_generated")?;
        let out_processed = component.add_out_big_port("out_processed")?;
        Ok(Self {
            component,
            processing_time,
            state: ProcessorState {
                clock: 0.,
                sigma: f64::INFINITY,
                current_job: None,
            },
            in_generated,
            out_processed,
        })
    }
}

impl Atomic for Processor {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        if let Some(job) = &self.state.current_job {
            // Safety: adding messages on the model's output port at lambda
            unsafe { self.out_processed.add_value(job.clone()) };
        }
    }

    fn delta_int(&mut self) {
        self.state.clock += self.state.sigma;
        self.state.current_job = None;
        self.state.sigma = f64::INFINITY;
    }

    fn delta_ext(&mut self, e: f64) {
        self.state.clock += e;
        self.state.sigma -= e;
        if self.state.current_job.is_none() {
            // an idle processor accepts the first incoming job
            // Safety: reading messages on the model's input port at delta_ext
            if let Some(job) = unsafe { self.in_generated.get_values() }.first() {
                let mut job = Job::clone(job);
                job.time_processed = self.state.clock + self.processing_time;
                self.state.current_job = Some(job);
                self.state.sigma = self.processing_time;
            }
        }
    }

    fn ta(&self) -> f64 {
        self.state.sigma
    }

    fn log_state(&self) -> String {
        self.state.to_string()
    }
}

#[derive(Debug)]
struct TransducerState {
    clock: f64,
    sigma: f64,
    n_generated: usize,
    n_processed: usize,
    total_ta: f64,
}

impl Display for TransducerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.n_generated, self.n_processed)
    }
}

/// It observes the generated and processed [`Job`]s and, after the observation
/// time, asks the generator to stop.
pub struct Transducer {
    component: Component,
    state: TransducerState,
    in_generated: InPort<Shared<Job>>,
    in_processed: InPort<Shared<Job>>,
    out_stop: OutPort<bool>,
}

impl Transducer {
    pub fn new(id: &str, obs_time: f64) -> Result<Self, ModelError> {
        let mut component = Component::new(id);
        let in_generated = component.add_in_big_port("in_generated")?;
        let in_processed = component.add_in_big_port("in_processed")?;
        let out_stop = component.add_out_port("out_stop")?;
        Ok(Self {
            component,
            state: TransducerState {
                clock: 0.,
                sigma: obs_time,
                n_generated: 0,
                n_processed: 0,
                total_ta: 0.,
            },
            in_generated,
            in_processed,
            out_stop,
        })
    }
}

impl Atomic for Transducer {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        // Safety: adding messages on the model's output port at lambda
        unsafe { self.out_stop.add_value(true) };
    }

    fn delta_int(&mut self) {
        self.state.clock += self.state.sigma;
        self.state.sigma = f64::INFINITY;
    }

    fn delta_ext(&mut self, e: f64) {
        self.state.clock += e;
        self.state.sigma -= e;
        // Safety: reading messages on the model's input ports at delta_ext
        let generated = unsafe { self.in_generated.get_values() };
        let processed = unsafe { self.in_processed.get_values() };
        self.state.n_generated += generated.len();
        for job in processed {
            self.state.n_processed += 1;
            self.state.total_ta += job.time_processed - job.time_generated;
        }
    }

    fn ta(&self) -> f64 {
        self.state.sigma
    }

    fn stop(&mut self) {
        let mean_ta = match self.state.n_processed {
            0 => 0.,
            n => self.state.total_ta / n as f64,
        };
        tracing::info!(
            transducer = self.component.get_id(),
            n_generated = self.state.n_generated,
            n_processed = self.state.n_processed,
            mean_ta,
            "observation finished"
        );
    }

    fn log_state(&self) -> String {
        self.state.to_string()
    }
}

/// Generator-Processor-Transducer coupled model builder.
pub struct Gpt;

impl Gpt {
    pub fn create(
        id: &str,
        job_period: f64,
        processing_time: f64,
        obs_time: f64,
    ) -> Result<Coupled, ModelError> {
        let mut gpt = Coupled::new(id);
        gpt.add_component(Generator::new("generator", job_period)?)?;
        gpt.add_component(Processor::new("processor", processing_time)?)?;
        gpt.add_component(Transducer::new("transducer", obs_time)?)?;

        gpt.add_ic("generator", "out_generated", "processor", "in_generated")?;
        gpt.add_ic("generator", "out_generated", "transducer", "in_generated")?;
        gpt.add_ic("processor", "out_processed", "transducer", "in_processed")?;
        gpt.add_ic("transducer", "out_stop", "generator", "in_stop")?;
        Ok(gpt)
    }
}

/// Experimental frame coupled model builder: a generator and a transducer
/// behind an input/output interface for jobs.
pub struct Ef;

impl Ef {
    pub fn create(id: &str, job_period: f64, obs_time: f64) -> Result<Coupled, ModelError> {
        let mut ef = Coupled::new(id);
        ef.add_in_big_port::<Job>("in_processed")?;
        ef.add_out_big_port::<Job>("out_generated")?;

        ef.add_component(Generator::new("generator", job_period)?)?;
        ef.add_component(Transducer::new("transducer", obs_time)?)?;

        ef.add_eic("in_processed", "transducer", "in_processed")?;
        ef.add_ic("transducer", "out_stop", "generator", "in_stop")?;
        ef.add_ic("generator", "out_generated", "transducer", "in_generated")?;
        ef.add_eoc("generator", "out_generated", "out_generated")?;
        Ok(ef)
    }
}

/// Experimental-frame-processor coupled model builder: an [`Ef`] connected to
/// an external [`Processor`]. Behaviorally equivalent to [`Gpt`].
pub struct Efp;

impl Efp {
    pub fn create(
        id: &str,
        job_period: f64,
        processing_time: f64,
        obs_time: f64,
    ) -> Result<Coupled, ModelError> {
        let mut efp = Coupled::new(id);
        efp.add_coupled(Ef::create("ef", job_period, obs_time)?)?;
        efp.add_component(Processor::new("processor", processing_time)?)?;

        efp.add_ic("ef", "out_generated", "processor", "in_generated")?;
        efp.add_ic("processor", "out_processed", "ef", "in_processed")?;
        Ok(efp)
    }
}
