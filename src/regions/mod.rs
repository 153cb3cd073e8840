pub mod boundary;
pub mod name;
pub mod partition;
pub mod seed;
pub mod smooth;
