pub mod auth;
pub mod constants;
pub mod error;
pub mod filter;
pub mod google_users;
pub mod handoff;
pub mod http;
pub mod messaging;
pub mod phone;
pub mod recipients;
pub mod registry;
pub mod report;
pub mod reset;
pub mod session;
pub mod sessions;
pub mod view;
