pub mod profiles;
pub mod search;
