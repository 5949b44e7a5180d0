pub mod exchange_rate;
pub mod scheduling;
pub mod travel;
