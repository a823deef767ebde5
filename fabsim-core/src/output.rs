use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::SimResult;
use crate::simulator::TrialSummary;

// ============================================================================
// Results file - `{ "simulation_<n>": [ProducerRecord, ...], ... }`
// ============================================================================

/// Serializes trials as a map keyed by trial label, in trial order.
#[derive(Debug, Clone, Copy)]
pub struct ResultsFile<'a> {
    trials: &'a [TrialSummary],
}

impl<'a> ResultsFile<'a> {
    pub fn new(trials: &'a [TrialSummary]) -> Self {
        Self { trials }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the whole file at once; nothing is written if serialization fails.
    pub fn write_to(&self, path: &Path) -> SimResult<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl Serialize for ResultsFile<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.trials.len()))?;
        for trial in self.trials {
            map.serialize_entry(&trial.label(), &trial.records)?;
        }
        map.end()
    }
}
