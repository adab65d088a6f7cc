pub mod lib;
pub mod providers;
