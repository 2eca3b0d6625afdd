pub mod constants;
pub mod detection;
pub mod execution_provider;
pub mod frame;
pub mod latest_slot;
pub mod model_resolver;
pub mod result;
