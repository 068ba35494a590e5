//! Browser adapters for the huddle-core ports: device-local storage,
//! completion clients, and the credential update call.

pub mod storage;
pub mod completion;
pub mod credential_update;
