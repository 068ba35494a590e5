//! Huddle core — conversation store, credential resolution, and the
//! message exchange orchestrator. Platform code plugs in through `ports`.

pub mod ports;
pub mod store;
pub mod credentials;
pub mod classify;
pub mod exchange;
pub mod event_bus;

#[cfg(test)]
mod tests;
