//! File-backed telemetry observer.
//!
//! Exit records go out as JSON lines; the daily census goes out as
//! tab-separated rows `day total clade_0 .. clade_n` with no header. A write
//! failure is logged once, later records are dropped, and the error is
//! returned from [`TelemetryObserver::finish`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use symbiosis_core::{OutputConfig, SimulationObserver};
use symbiosis_types::{ExitRecord, PopulationSample};
use tracing::{info, warn};

use crate::error::EngineError;

/// One output stream and where it goes.
struct Sink<W> {
    path: PathBuf,
    writer: W,
}

/// Observer writing telemetry to any pair of writers.
pub struct TelemetryObserver<W: Write> {
    exits: Option<Sink<W>>,
    population: Option<Sink<W>>,
    records_written: u64,
    failure: Option<EngineError>,
}

/// Telemetry written to the files named in the output config.
pub type FileObserver = TelemetryObserver<BufWriter<File>>;

fn open(path: &Path) -> Result<(PathBuf, BufWriter<File>), EngineError> {
    let file = File::create(path).map_err(|source| EngineError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((path.to_path_buf(), BufWriter::new(file)))
}

impl FileObserver {
    /// Open the output files enabled in `output`, truncating existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Output`] if a file cannot be created.
    pub fn create(output: &OutputConfig) -> Result<Self, EngineError> {
        let exits = output
            .write_exit_records
            .then(|| open(&output.exit_records))
            .transpose()?;
        let population = output
            .write_population
            .then(|| open(&output.population))
            .transpose()?;
        info!(
            exit_records = ?exits.as_ref().map(|(path, _)| path),
            population = ?population.as_ref().map(|(path, _)| path),
            "Telemetry files opened"
        );
        Ok(Self::new(exits, population))
    }
}

impl<W: Write> TelemetryObserver<W> {
    /// Observer over `(path, writer)` pairs; `None` disables a stream. The
    /// path only labels errors.
    pub fn new(exits: Option<(PathBuf, W)>, population: Option<(PathBuf, W)>) -> Self {
        let sink = |(path, writer)| Sink { path, writer };
        Self {
            exits: exits.map(sink),
            population: population.map(sink),
            records_written: 0,
            failure: None,
        }
    }

    /// Number of exit records written.
    pub const fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush both streams and hand back the writers.
    ///
    /// # Errors
    ///
    /// Returns the first write error seen during the run, or a flush error.
    pub fn finish(self) -> Result<(Option<W>, Option<W>), EngineError> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        let mut outputs = [self.exits, self.population];
        for sink in outputs.iter_mut().flatten() {
            sink.writer.flush().map_err(|source| EngineError::Output {
                path: sink.path.clone(),
                source,
            })?;
        }
        let [exits, population] = outputs;
        Ok((exits.map(|s| s.writer), population.map(|s| s.writer)))
    }

    fn record_failure(&mut self, error: EngineError) {
        warn!(error = %error, "Telemetry write failed, further records dropped");
        self.failure = Some(error);
    }
}

fn write_exit<W: Write>(sink: &mut Sink<W>, record: &ExitRecord) -> Result<(), EngineError> {
    let line = serde_json::to_string(record)?;
    writeln!(sink.writer, "{line}").map_err(|source| EngineError::Output {
        path: sink.path.clone(),
        source,
    })
}

fn write_sample<W: Write>(sink: &mut Sink<W>, sample: &PopulationSample) -> Result<(), EngineError> {
    let mut row = format!("{}\t{}", sample.day, sample.total);
    for count in &sample.per_clade {
        row.push('\t');
        row.push_str(&count.to_string());
    }
    writeln!(sink.writer, "{row}").map_err(|source| EngineError::Output {
        path: sink.path.clone(),
        source,
    })
}

impl<W: Write> SimulationObserver for TelemetryObserver<W> {
    fn on_exit(&mut self, record: &ExitRecord) {
        if self.failure.is_some() {
            return;
        }
        let Some(sink) = self.exits.as_mut() else {
            return;
        };
        match write_exit(sink, record) {
            Ok(()) => self.records_written = self.records_written.saturating_add(1),
            Err(error) => self.record_failure(error),
        }
    }

    fn on_population(&mut self, sample: &PopulationSample) {
        if self.failure.is_some() {
            return;
        }
        let Some(sink) = self.population.as_mut() else {
            return;
        };
        if let Err(error) = write_sample(sink, sample) {
            self.record_failure(error);
        }
    }
}
