pub mod flash;
pub mod hash;
pub mod jwt;
pub mod search;
