pub mod memory;
pub mod pool;
pub mod queries;
pub mod store;

pub use memory::MemoryPriceStore;
pub use pool::create_pool;
pub use queries::{PgPriceStore, PgPriceTx};
pub use store::{PriceStore, PriceTx};
