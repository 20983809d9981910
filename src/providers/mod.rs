pub mod memory;
pub mod postgrest;

pub use memory::MemoryRateStore;
pub use postgrest::PostgrestRateStore;
