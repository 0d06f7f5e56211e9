//! Axum HTTP surface over [`RecordService`](crate::records::RecordService).
//!
//! Every route maps one-to-one onto a record operation; errors are rendered
//! as [`ErrorResponse`](common::protocol::ErrorResponse) bodies with the
//! status from [`ServiceError::http_status`](common::ServiceError::http_status).

pub mod handlers;
pub mod router;
pub mod state;
