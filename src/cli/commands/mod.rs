pub mod db;
pub mod series;
pub mod user;
