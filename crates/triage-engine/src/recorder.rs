//! Case recording
//!
//! Every diagnosis run can be archived as a [`Case`]. Recorders are
//! write-once sinks: nothing in the engine reads a case back.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use triage_core::{Case, CaseId};

use crate::error::RecorderError;

/// Sink for finished diagnosis sessions
pub trait CaseRecorder: Send + Sync {
    fn record(&self, case: &Case) -> Result<CaseId, RecorderError>;
}

/// Bounded in-memory case log; the oldest cases are dropped first
#[derive(Debug)]
pub struct MemoryRecorder {
    cases: Mutex<Vec<Case>>,
    max_cases: usize,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::with_max_cases(10_000)
    }

    pub fn with_max_cases(max: usize) -> Self {
        Self {
            cases: Mutex::new(Vec::new()),
            max_cases: max,
        }
    }

    /// Snapshot of the recorded cases, oldest first
    pub fn cases(&self) -> Vec<Case> {
        self.cases.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cases.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseRecorder for MemoryRecorder {
    fn record(&self, case: &Case) -> Result<CaseId, RecorderError> {
        let mut cases = self
            .cases
            .lock()
            .map_err(|_| RecorderError::Unavailable("case log lock poisoned".to_string()))?;

        cases.push(case.clone());
        if cases.len() > self.max_cases {
            let drain_count = cases.len() - self.max_cases;
            cases.drain(0..drain_count);
        }

        Ok(CaseId::from(case.id))
    }
}

/// Appends one JSON object per line to a file
#[derive(Debug)]
pub struct JsonlRecorder {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlRecorder {
    /// Open for appending, creating the file if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaseRecorder for JsonlRecorder {
    fn record(&self, case: &Case) -> Result<CaseId, RecorderError> {
        let mut line = serde_json::to_string(case)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| RecorderError::Unavailable(format!("{} lock poisoned", self.path.display())))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        Ok(CaseId::from(case.id))
    }
}

/// Read back a JSON Lines case log. Blank lines are skipped.
pub fn read_cases(path: impl AsRef<Path>) -> Result<Vec<Case>, RecorderError> {
    let reader = BufReader::new(File::open(path)?);
    let mut cases = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        cases.push(serde_json::from_str(&line)?);
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{Diagnosis, Domain, Facts};

    fn case(latency: i64) -> Case {
        Case::new(
            Domain::Network,
            Facts::new().with("ping_latency", latency),
            vec![Diagnosis::insufficient_data(0.2)],
        )
    }

    #[test]
    fn test_memory_recorder_returns_case_id() {
        let recorder = MemoryRecorder::new();
        let case = case(250);

        let id = recorder.record(&case).unwrap();
        assert_eq!(id, CaseId::from(case.id));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_memory_recorder_trims_oldest() {
        let recorder = MemoryRecorder::with_max_cases(2);
        for latency in [100, 200, 300] {
            recorder.record(&case(latency)).unwrap();
        }

        let latencies: Vec<_> = recorder
            .cases()
            .iter()
            .map(|c| c.facts.get("ping_latency").and_then(|v| v.as_f64()))
            .collect();
        assert_eq!(latencies, vec![Some(200.0), Some(300.0)]);
    }
}
