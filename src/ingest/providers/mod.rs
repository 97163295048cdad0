pub mod alm;
pub mod weather;
