//! Log handler that sends each event to the chat topic its originating code
//! is marked for.
//!
//! The handler owns no transport: it plans a [`Delivery`] and hands it to a
//! [`Dispatch`] implementation.

mod config;
mod error;
mod format;
mod handler;

pub use config::{ChatId, HandlerConfig, PUBLIC_BOT_API};
pub use error::{HandlerError, Result};
pub use format::{Format, PlainFormatter};
pub use handler::{Delivery, DeliveryMode, Dispatch, LogHandler};
