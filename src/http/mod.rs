//! HTTP API and websocket relay endpoint
//!
//! - POST /api/sessions - Create a session from a prompt and asset manifest
//! - GET /api/sessions - List sessions (`?active_only=true`)
//! - GET /api/sessions/:id - Session details
//! - POST /api/sessions/:id/end - End a session
//! - GET /api/sessions/:id/artifacts/{json,transcript,transcript.txt} - Summary and transcript
//! - POST /api/connections/:id - Open the session's relay
//! - DELETE /api/connections/:id - Close the session's relay
//! - GET /api/connections/:id/status - Relay status
//! - GET /ws/:id - Websocket client for the open relay
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;
mod ws;

pub use routes::create_router;
pub use state::AppState;
