//! Darc Authentication
//!
//! Centralized authentication for services that delegate "may this caller
//! invoke `Service.Method`?" to a shared policy store.
//!
//! When starting up, the service seeds a root record with rule `*` whose
//! only owner and user is the server's own key: whoever holds that key may
//! sign for any method of any service. Finer-grained control comes from
//! records for `Service` or `Service.Method`; the most specific published
//! record governs a call.
//!
//! A service that wants authentication embeds an [`Auth`] in its request
//! messages and calls [`AuthenticationService::verify_auth`] with its own
//! service and method name.

#![forbid(unsafe_code)]

pub mod config;
pub mod messages;
pub mod service;

pub use config::ServiceConfig;
pub use messages::{
    AddPolicy, AddPolicyReply, Auth, GetPolicy, GetPolicyReply, UpdatePolicy, UpdatePolicyPin,
    UpdatePolicyPinReply, UpdatePolicyReply,
};
pub use service::{AuthenticationService, SERVICE_NAME};
