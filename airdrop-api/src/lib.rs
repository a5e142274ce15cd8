//! Airdrop API Server
//!
//! REST API for the promotional airdrop campaign.
//!
//! ## Endpoints
//!
//! ### Submissions
//! - POST /verify - Validate a post and send the reward
//! - GET /share - Promotional text and compose link for a wallet
//!
//! ### Campaign
//! - GET /campaign - Campaign state
//! - POST /campaign/active - Open or close the campaign
//!
//! ### Participants (admin)
//! - GET /users - All participants, newest first
//! - GET /users/stats - Participant counts per status
//! - POST /users/:id/status - Resolve a record in manual review
//!
//! ### Health
//! - GET /health - Liveness and version

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use dto::*;
pub use error::*;
pub use routes::*;
pub use server::*;
pub use state::*;
