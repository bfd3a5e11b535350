pub mod gateway;
pub mod invoke;
pub mod param;
pub mod token;
