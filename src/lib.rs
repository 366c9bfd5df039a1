//! Contact Relay: contact-form submissions to mail (and optionally entries).

pub mod config;
pub mod error;
pub mod flash;
pub mod form;
pub mod guard;
pub mod pipeline;
pub mod routes;
pub mod sinks;
pub mod store;
