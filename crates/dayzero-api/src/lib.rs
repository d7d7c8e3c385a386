// dayzero-api: Async Rust client for the cloud network controller REST API

pub mod auth;
pub mod client;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod models;
pub mod sites;
pub mod transport;

pub use auth::CloudRegion;
pub use client::ControllerClient;
pub use error::Error;
pub use models::{
    AssignRequest, AssignResponse, ClaimResponse, CreateSiteRequest, InventoryItem, Privilege,
    SelfInfo, SiteInfo,
};
pub use transport::{TlsMode, TransportConfig};
