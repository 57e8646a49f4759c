//! HTTP API layer for maws.
//!
//! - **Endpoints**: gallery accounts, clients, tags, client columns, Excel
//!   import, artworks, SMS broadcasts and admin statistics
//! - **Extractors**: authenticated user, caller IP, user agent
//! - **Middleware**: bearer-token authentication, admin IP allow-list
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
