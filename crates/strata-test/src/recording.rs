//! Engine instrumentation
//!
//! [`RecordingEngine`] forwards every call to an inner engine and keeps a log
//! of what was asked, so tests can assert how an operation used the engine.

use parking_lot::Mutex;
use strata_core::{Aggregator, ArrayEngine, LabelledArray, NdArrayEngine, StrataResult};

/// One logged engine call
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    Collapse {
        coords: Vec<String>,
        aggregator: Aggregator,
    },
    Extract {
        coord: String,
        matched: bool,
    },
    SlicesOver {
        coord: String,
        count: usize,
    },
    Slices {
        keep: Vec<String>,
        count: usize,
    },
    Merge {
        inputs: usize,
    },
    CheckCoordinates,
}

/// Engine wrapper that logs every call
#[derive(Debug, Default)]
pub struct RecordingEngine<E = NdArrayEngine> {
    inner: E,
    calls: Mutex<Vec<EngineCall>>,
}

impl<E: ArrayEngine> RecordingEngine<E> {
    pub fn new(inner: E) -> Self {
        RecordingEngine {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the calls made so far
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl<E: ArrayEngine> ArrayEngine for RecordingEngine<E> {
    fn collapse(
        &self,
        array: &LabelledArray,
        coords: &[&str],
        aggregator: Aggregator,
    ) -> StrataResult<LabelledArray> {
        self.record(EngineCall::Collapse {
            coords: owned(coords),
            aggregator,
        });
        self.inner.collapse(array, coords, aggregator)
    }

    fn extract(
        &self,
        array: &LabelledArray,
        coord: &str,
        predicate: &dyn Fn(f64) -> bool,
    ) -> StrataResult<Option<LabelledArray>> {
        let result = self.inner.extract(array, coord, predicate)?;
        self.record(EngineCall::Extract {
            coord: coord.to_string(),
            matched: result.is_some(),
        });
        Ok(result)
    }

    fn slices_over(&self, array: &LabelledArray, coord: &str) -> StrataResult<Vec<LabelledArray>> {
        let slices = self.inner.slices_over(array, coord)?;
        self.record(EngineCall::SlicesOver {
            coord: coord.to_string(),
            count: slices.len(),
        });
        Ok(slices)
    }

    fn slices(&self, array: &LabelledArray, keep: &[&str]) -> StrataResult<Vec<LabelledArray>> {
        let slices = self.inner.slices(array, keep)?;
        self.record(EngineCall::Slices {
            keep: owned(keep),
            count: slices.len(),
        });
        Ok(slices)
    }

    fn merge(&self, arrays: Vec<LabelledArray>) -> StrataResult<LabelledArray> {
        self.record(EngineCall::Merge {
            inputs: arrays.len(),
        });
        self.inner.merge(arrays)
    }

    fn check_coordinates(
        &self,
        original: &LabelledArray,
        result: LabelledArray,
    ) -> StrataResult<LabelledArray> {
        self.record(EngineCall::CheckCoordinates);
        self.inner.check_coordinates(original, result)
    }
}
