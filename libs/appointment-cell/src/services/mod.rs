pub mod slots;
pub mod store;
pub mod memory_store;
pub mod supabase_store;
pub mod lifecycle;
pub mod expiry;

pub use slots::*;
pub use store::*;
pub use memory_store::*;
pub use supabase_store::*;
pub use lifecycle::*;
pub use expiry::*;
