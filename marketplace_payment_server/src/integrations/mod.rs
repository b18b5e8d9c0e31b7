pub mod email;
pub mod stripe;
