pub mod describe;
pub mod health;
