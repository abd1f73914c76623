//! Runtime collaborators the generated parsers call into once a module is compiled: the
//! Sink Engine (§4.6), its Filter chain (§3/§4.6), and the process-wide MIME Registry
//! (§4.7) that `connect_by_mime` consults.

pub mod filter;
pub mod mime;
pub mod sink;

pub use filter::{Filter, FilterChain};
pub use mime::MimeRegistry;
pub use sink::Sink;
