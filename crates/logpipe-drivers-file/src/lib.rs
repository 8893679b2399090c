//! A file-tail source, a file-append destination, and the internal mark
//! source, implementing `logpipe-core`'s driver contract against real
//! filesystem I/O. Minimal but real, serving both as a worked example of
//! implementing the contract and as the fixture drivers
//! `logpipe-contract-tests` runs its conformance suite against.

mod append;
mod endpoint;
mod mark;
mod tail;

pub use append::FileAppendDestination;
pub use endpoint::SourceEndpoint;
pub use mark::InternalMarkSource;
pub use tail::FileTailSource;
