// handlers/protected/mod.rs - Routes behind `require_auth`
//
// Every handler here receives the verified caller as `Extension<AuthUser>`.

pub mod lessons;
pub mod me;
pub mod series;
pub mod tracking;
pub mod users;
