pub mod failures;
pub mod postgres;
pub mod reload;
