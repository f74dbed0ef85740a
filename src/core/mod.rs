pub mod acquirer;
pub mod engine;
pub mod extraction;
pub mod fallback;
pub mod netlist;
pub mod stream;

pub use crate::domain::model::{ComponentValues, DesignRequest, DesignResult};
pub use crate::domain::ports::{InferenceService, Storage};
pub use crate::utils::error::Result;
