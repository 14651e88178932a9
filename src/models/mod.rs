pub mod price;

pub use price::{BatchSummary, PostPricesResponse, PriceRecord};
