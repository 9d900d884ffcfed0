pub mod cancellation;
pub mod worker;
