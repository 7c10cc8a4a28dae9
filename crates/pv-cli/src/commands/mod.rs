pub mod cable;
pub mod completions;
pub mod dcdb;
pub mod drop;
pub mod mppt;
pub mod project;
pub mod protection;
pub mod string;
