/*!
 * Monitoring
 * Structured tracing for the compatibility layer
 */

mod tracer;

pub use tracer::{init_tracing, CallSpan};
