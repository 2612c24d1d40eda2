// handlers/public/mod.rs - Routes reachable without a bearer token

pub mod series;
pub mod system;
