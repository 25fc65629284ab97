pub mod client;
pub mod types;

pub use client::{postback_url_for, RingClient, RING_API_BASE};
pub use types::{Alerts, Device, Devices, Owner, User, UserInfo};
