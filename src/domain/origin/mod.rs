//! Origin sources: external systems documents are ingested from

mod change;
mod source;

pub use change::{ChangeEvent, ChangeEventSource, ChangeStream};
pub use source::{OriginConnectionConfig, OriginSource, OriginSourceFactory, OriginSourceType};

#[cfg(test)]
pub use change::mock as change_mock;
#[cfg(test)]
pub use source::mock;
