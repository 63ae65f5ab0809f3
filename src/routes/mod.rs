pub mod health;
pub mod predict;
pub mod predictions;
pub mod prices;
