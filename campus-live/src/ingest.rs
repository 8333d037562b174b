//! Telemetry Ingest
//!
//! Resolves a reading's sensor to its space and runs exactly one
//! reconciliation pass. A reading that fails validation or names an
//! unbound sensor is rejected before anything is touched.

use crate::db::SpaceDirectory;
use crate::model::{IngestOutcome, TelemetryReading};
use crate::reconciler::Reconciler;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TelemetryIngest {
    directory: Arc<dyn SpaceDirectory>,
    reconciler: Arc<Reconciler>,
}

impl TelemetryIngest {
    pub fn new(directory: Arc<dyn SpaceDirectory>, reconciler: Arc<Reconciler>) -> Self {
        Self {
            directory,
            reconciler,
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn directory(&self) -> &Arc<dyn SpaceDirectory> {
        &self.directory
    }

    pub async fn ingest(&self, reading: TelemetryReading) -> Result<IngestOutcome> {
        if reading.sensor_id.trim().is_empty() {
            return Err(Error::InvalidReading("sensorId must not be empty".to_string()));
        }

        let Some(space) = self.directory.find_by_sensor(&reading.sensor_id).await? else {
            warn!(sensor_id = %reading.sensor_id, "Telemetry from unbound sensor rejected");
            return Err(Error::BindingNotFound(reading.sensor_id));
        };

        debug!(
            sensor_id = %reading.sensor_id,
            space_id = %space.space_id,
            person_count = reading.person_count,
            "Routing reading"
        );

        let outcome = self
            .reconciler
            .reconcile(&space, reading.person_count, reading.timestamp)
            .await;

        Ok(IngestOutcome {
            accepted: outcome.accepted,
            is_ghost: outcome.state.as_ref().is_some_and(|state| state.is_ghost()),
            space_id: space.space_id,
        })
    }
}

/// Check a raw person count from the wire
pub fn validate_person_count(count: i64) -> Result<u32> {
    u32::try_from(count).map_err(|_| {
        Error::InvalidReading(format!("personCount must be a non-negative integer, got {}", count))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_person_count() {
        assert_eq!(validate_person_count(0).unwrap(), 0);
        assert_eq!(validate_person_count(42).unwrap(), 42);
        assert!(matches!(validate_person_count(-1), Err(Error::InvalidReading(_))));
        assert!(matches!(
            validate_person_count(i64::from(u32::MAX) + 1),
            Err(Error::InvalidReading(_))
        ));
    }
}
