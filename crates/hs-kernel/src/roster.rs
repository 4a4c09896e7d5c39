//! CSV fleet roster loader.
//!
//! # CSV format
//!
//! ```csv
//! doctor_id,specialty
//! 0,generalist
//! 1,cardiology
//! 2,emergency
//! ```
//!
//! Ids must cover `0..n` exactly once; row order does not matter.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use hs_core::Specialty;

use crate::{KernelError, KernelResult};

#[derive(Deserialize)]
struct RosterRecord {
    doctor_id: u32,
    specialty: String,
}

/// Load a roster from a CSV file.  The result feeds [`Fleet::from_roster`].
///
/// [`Fleet::from_roster`]: crate::Fleet::from_roster
pub fn load_roster_csv(path: &Path) -> KernelResult<Vec<Specialty>> {
    let file = std::fs::File::open(path)?;
    load_roster_reader(file)
}

/// Like [`load_roster_csv`] but accepts any `Read` source.
pub fn load_roster_reader<R: Read>(reader: R) -> KernelResult<Vec<Specialty>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows: Vec<(u32, Specialty)> = Vec::new();

    for result in rdr.deserialize::<RosterRecord>() {
        let row = result.map_err(|e| KernelError::Parse(e.to_string()))?;
        let specialty = row
            .specialty
            .parse::<Specialty>()
            .map_err(|e| KernelError::Parse(e.to_string()))?;
        rows.push((row.doctor_id, specialty));
    }

    rows.sort_by_key(|(id, _)| *id);
    for (expected, (id, _)) in rows.iter().enumerate() {
        if *id as usize != expected {
            return Err(KernelError::Parse(format!(
                "doctor ids must be 0..{} without gaps or duplicates; found {id} at position {expected}",
                rows.len()
            )));
        }
    }
    Ok(rows.into_iter().map(|(_, s)| s).collect())
}
