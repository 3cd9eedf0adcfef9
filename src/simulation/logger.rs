use crate::{DynRef, SharedCell};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Interface for simulation loggers. Loggers receive the simulation data
/// (times, output messages, and model states) already rendered as strings;
/// they must not mutate the simulation.
pub trait Logger: DynRef {
    /// Executed once before the simulation starts.
    fn start(&mut self) {}

    /// Executed once after the simulation stops.
    fn stop(&mut self) {}

    /// It logs the simulation time at the beginning of every cycle.
    fn log_time(&mut self, time: f64) {
        let _ = time;
    }

    /// It logs one output message produced by an atomic model.
    fn log_output(
        &mut self,
        time: f64,
        model_id: usize,
        model_name: &str,
        port_name: &str,
        message: &str,
    );

    /// It logs the state of an atomic model after a state transition.
    fn log_state(&mut self, time: f64, model_id: usize, model_name: &str, state: &str);
}

/// Shared logger handle. In sequential simulations it is a plain `Rc<RefCell<_>>`;
/// under the `par` feature it is an `Arc<Mutex<_>>`, so concurrent workers
/// serialize their logging calls through the mutex.
pub type SharedLogger = SharedCell<dyn Logger>;

/// CSV logger. It writes one row per output message and state transition with
/// the columns `time,model_id,model_name,port_name,data`.
pub struct CsvLogger {
    sep: String,
    file: BufWriter<File>,
}

impl CsvLogger {
    /// Creates the CSV file at the provided path. The separator is `,`.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::with_separator(path, ",")
    }

    /// Creates the CSV file at the provided path with a custom column separator.
    pub fn with_separator(path: impl AsRef<Path>, sep: &str) -> std::io::Result<Self> {
        Ok(Self {
            sep: sep.to_string(),
            file: BufWriter::new(File::create(path)?),
        })
    }

}

fn check_row(row: std::io::Result<()>) {
    if let Err(err) = row {
        tracing::warn!("could not write log row: {err}");
    }
}

impl Logger for CsvLogger {
    fn start(&mut self) {
        check_row(writeln!(
            self.file,
            "time{sep}model_id{sep}model_name{sep}port_name{sep}data",
            sep = self.sep
        ));
    }

    fn stop(&mut self) {
        check_row(self.file.flush());
    }

    fn log_output(
        &mut self,
        time: f64,
        model_id: usize,
        model_name: &str,
        port_name: &str,
        message: &str,
    ) {
        check_row(writeln!(
            self.file,
            "{time}{sep}{model_id}{sep}{model_name}{sep}{port_name}{sep}{message}",
            sep = self.sep
        ));
    }

    fn log_state(&mut self, time: f64, model_id: usize, model_name: &str, state: &str) {
        check_row(writeln!(
            self.file,
            "{time}{sep}{model_id}{sep}{model_name}{sep}{sep}{state}",
            sep = self.sep
        ));
    }
}

/// Logger that prints every record to the standard output.
#[derive(Debug, Default)]
pub struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log_time(&mut self, time: f64) {
        println!("{time:.3} ----------------------------------------");
    }

    fn log_output(
        &mut self,
        time: f64,
        model_id: usize,
        model_name: &str,
        port_name: &str,
        message: &str,
    ) {
        println!("{time:.3} [{model_id}] {model_name}::{port_name}: {message}");
    }

    fn log_state(&mut self, time: f64, model_id: usize, model_name: &str, state: &str) {
        println!("{time:.3} [{model_id}] {model_name}: {state}");
    }
}

/// One output message record of a [`MemoryLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub time: f64,
    pub model_id: usize,
    pub model_name: String,
    pub port_name: String,
    pub message: String,
}

/// One state record of a [`MemoryLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    pub time: f64,
    pub model_id: usize,
    pub model_name: String,
    pub state: String,
}

/// Logger that keeps every record in memory. Useful for tests and for
/// comparing the outcome of two simulations of equivalent models.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    pub times: Vec<f64>,
    pub outputs: Vec<OutputRecord>,
    pub states: Vec<StateRecord>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the output records as (time, model, port, message) tuples,
    /// sorted so that two runs can be compared regardless of the order in
    /// which simultaneous outputs were logged.
    pub fn sorted_outputs(&self) -> Vec<(u64, String, String, String)> {
        let mut outputs: Vec<_> = self
            .outputs
            .iter()
            .map(|o| {
                (
                    o.time.to_bits(),
                    o.model_name.clone(),
                    o.port_name.clone(),
                    o.message.clone(),
                )
            })
            .collect();
        outputs.sort();
        outputs
    }
}

impl Logger for MemoryLogger {
    fn log_time(&mut self, time: f64) {
        self.times.push(time);
    }

    fn log_output(
        &mut self,
        time: f64,
        model_id: usize,
        model_name: &str,
        port_name: &str,
        message: &str,
    ) {
        self.outputs.push(OutputRecord {
            time,
            model_id,
            model_name: model_name.to_string(),
            port_name: port_name.to_string(),
            message: message.to_string(),
        });
    }

    fn log_state(&mut self, time: f64, model_id: usize, model_name: &str, state: &str) {
        self.states.push(StateRecord {
            time,
            model_id,
            model_name: model_name.to_string(),
            state: state.to_string(),
        });
    }
}
