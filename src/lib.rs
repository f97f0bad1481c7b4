// Copyright 2026 Chartstream Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chartstream — incremental time-series streaming over plain HTTP.
//!
//! A server serves append-only (time, value) series from a pluggable data
//! source; clients keep local copies fresh by asking only for rows past
//! their per-series watermark, one batched request per cycle. Series can
//! be joined into multi-column tables on the shared time axis.

pub mod cli;
pub mod client;
pub mod compose;
pub mod poller;
pub mod server;
pub mod source;
pub mod store;
pub mod types;
pub mod upload;
pub mod wire;

pub use client::{ChartClient, FetchReport};
pub use compose::{Multichart, Table};
pub use poller::Poller;
pub use server::{ChartServer, ServerState};
pub use store::{MergeOutcome, Series, SeriesStore};
pub use types::*;
