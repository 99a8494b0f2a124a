//! The HTTP side of the server, such as it is.
//!
//! There is no request parser. A connection is read once, the bytes are
//! [`classify`](classify::classify)-ed, and one of two prepared payloads is
//! written back before the connection is closed:
//!
//! ```text
//!   accept ──▶ awaiting request ──▶ read once ──▶ classify
//!                                                  │
//!                          ┌───────────────────────┴──────┐
//!                          ▼ valid                invalid ▼
//!                   content page                    404 page
//!                          └──────────────┬───────────────┘
//!                                         ▼
//!                               write (best effort), close
//! ```
//!
//! - **`classify`**: the fixed-offset root-path check
//! - **`connection`**: accepting peers and answering them
//! - **`response`**: status codes and the built-in pages
//! - **`writer`**: single, non-retrying writes

pub mod classify;
pub mod connection;
pub mod response;
pub mod writer;
