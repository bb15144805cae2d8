pub mod cancellation;
pub mod checkout;
pub mod confirmation;
pub mod sweeper;
