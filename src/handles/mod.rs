/*!
 * Handle Tables
 * Process-wide style registries, owned explicitly by the runtime
 */

mod table;

pub use table::HandleTable;
