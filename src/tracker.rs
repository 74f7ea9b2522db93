//! Periodic byte counter reporting to a tracker endpoint.
//!
//! [`ReportLoop`] runs beside a [`Torrent`](crate::Torrent) and reports its
//! transfer counters over HTTP through a [`ReportClient`]. Responses are
//! untrusted: [`ReportResponse`] keeps only fields with the expected type
//! and range.

mod client;
mod error;
mod report;
mod response;

pub use client::ReportClient;
pub use error::TrackerError;
pub use report::ReportLoop;
pub use response::ReportResponse;

#[cfg(test)]
mod tests;
