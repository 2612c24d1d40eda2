// handlers/mod.rs - Route handlers grouped by access tier
//
// Public (no auth) → Protected (bearer token verified by `require_auth`)
// Proxy handlers forward whole route prefixes to sibling services.

pub mod form;
pub mod protected;
pub mod proxy;
pub mod public;

pub use form::FormData;
