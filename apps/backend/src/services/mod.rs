pub mod dispatcher;

pub use dispatcher::{DispatcherConfig, SessionDispatcher, WriteMode};
