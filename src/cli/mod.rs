pub mod prices;
pub mod simulate;
pub mod ui;
