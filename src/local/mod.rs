//! Local generation through a Python script instead of the hosted API.
pub mod interpreter;
pub mod predictor;

pub use predictor::{LocalPrediction, LocalPredictor};
