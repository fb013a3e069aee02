use super::wavelength::Wavelength;
use crate::core::crystal::structure::CrystalStructure;
use crate::core::models::pattern::DiffractionPattern;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    /// The structure cannot be simulated; only this record is affected.
    #[error("simulation failed: {0}")]
    Record(String),
    #[error("simulation exceeded the per-record timeout of {0:?}")]
    Timeout(Duration),
    /// The simulator itself is unusable; the run must stop.
    #[error("simulator backend failure: {0}")]
    Backend(String),
}

/// Adapter boundary to a diffraction simulator.
///
/// Implementations return the reciprocal-lattice basis and reflections in their native
/// order. Intensities must already carry the Lorentz-polarization correction and every
/// reflection must carry a form factor vector with one entry per tracked element.
pub trait DiffractionSimulator: Send + Sync {
    fn simulate(
        &self,
        structure: &CrystalStructure,
        wavelength: Wavelength,
    ) -> Result<DiffractionPattern, SimulationError>;
}

impl<S: DiffractionSimulator + ?Sized> DiffractionSimulator for Box<S> {
    fn simulate(
        &self,
        structure: &CrystalStructure,
        wavelength: Wavelength,
    ) -> Result<DiffractionPattern, SimulationError> {
        (**self).simulate(structure, wavelength)
    }
}

/// Bounds every call of the wrapped simulator by a wall-clock timeout.
///
/// Each call runs on its own helper thread. A call that does not answer in time is
/// reported as [`SimulationError::Timeout`] and its thread is left to finish detached.
pub struct TimeoutSimulator<S> {
    inner: Arc<S>,
    timeout: Duration,
}

impl<S> TimeoutSimulator<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<S: DiffractionSimulator + 'static> DiffractionSimulator for TimeoutSimulator<S> {
    fn simulate(
        &self,
        structure: &CrystalStructure,
        wavelength: Wavelength,
    ) -> Result<DiffractionPattern, SimulationError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let structure = structure.clone();

        thread::Builder::new()
            .name("xrd-simulate".to_string())
            .spawn(move || {
                // The receiver is gone once the caller timed out.
                let _ = tx.send(inner.simulate(&structure, wavelength));
            })
            .map_err(|e| SimulationError::Backend(format!("cannot spawn simulation thread: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.timeout, "Simulation call abandoned after timeout.");
                Err(SimulationError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SimulationError::Record(
                "simulation thread terminated without a result".to_string(),
            )),
        }
    }
}
