//! Built-in job handlers.

pub mod notification;
pub mod render;

pub use notification::SendNotificationHandler;
pub use render::RenderDocumentHandler;
