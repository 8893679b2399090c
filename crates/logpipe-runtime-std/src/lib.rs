//! Concrete threaded worker substrate implementing `logpipe-core`'s
//! `driver`/`worker` contracts against real OS threads and
//! `std::sync::{Mutex, Condvar}`: each source and destination gets its own
//! blocking-I/O thread, decoupled from the single-threaded main loop by a
//! queue or channel.

mod destination;
mod endpoint;
mod main_loop;
mod source;

pub use destination::DestinationRuntime;
pub use endpoint::DestinationEndpoint;
pub use main_loop::MainLoop;
pub use source::{SourceQueue, SourceRuntime, NO_TRAFFIC_POLL_INTERVAL};
