pub mod analyzer;
pub mod dataset;
pub mod orchestrator;
pub mod prompts;
pub mod ranker;
pub mod registry;
pub mod resolver;
pub mod sources;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use orchestrator::Orchestrator;
pub use registry::{TaskRecord, TaskRegistry};
pub use resolver::HttpLinkResolver;
pub use sources::ApifySource;
pub use traits::{LinkResolver, ReviewSource, Summarizer};
