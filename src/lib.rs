#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # flowview
//!
//! The `flowview` crate keeps the live, filtered and sorted list of flows an
//! intercepting proxy has captured, and tells observers exactly what changed.
//!
//! - A [`View`] tracks every flow it is given and shows those that pass its
//!   [`Filter`], ordered by an [`OrderKey`]
//! - A [`Focus`] follows one selected flow through inserts and removals
//! - A [`SettingsStore`] keeps per-flow annotations for as long as the flow
//!   is tracked
//! - [`Signals`] report every change synchronously
//!
//! ## Feeding a view
//!
//! ```rust
//! use flowview::{Flow, Request, SignalEvent, View};
//!
//! let mut view = View::new();
//! view.signals_mut().added.connect(|view: &View, event: &SignalEvent| {
//!   println!("{} flows, {:?}", view.len(), event);
//! });
//! let request: Request = Request::builder()
//!   .uri("http://example.com/index.html")
//!   .body(())
//!   .unwrap()
//!   .into();
//! let flow = Flow::new(request);
//! let id = flow.id();
//! view.request(flow);
//! assert_eq!(view.index_of(&id), Some(0));
//! ```
//!
//! ## Filtering and ordering
//!
//! ```rust
//! # fn run() -> flowview::Result<()> {
//! let mut view = flowview::View::new();
//! view.set_filter(flowview::Filter::parse("~m get | ~c 404")?);
//! view.set_order("size")?;
//! view.set_reversed(true);
//! # Ok(())
//! # }
//! ```
//!
//! Everything can also be set at once from [`Options`] with
//! [`View::configure`], which rejects bad values without touching the view.
//!
//! ## Optional Features
//!
//! The following are a list of [Cargo features][cargo-features] that can be
//! enabled or disabled:
//!
//! - **charset**: Decode body text using the `Content-Type` charset.
//! - **gzip**: Decode gzip bodies before matching them.
//! - **serde**: Provides serialization and deserialization support.
//! - **schema**: JSON schema for [`Options`].
//!
//! [cargo-features]: https://doc.rust-lang.org/stable/cargo/reference/manifest.html#the-features-section
mod body;
mod errors;
/// Filter expressions
pub mod filter;
mod flow;
mod focus;
mod options;
mod order;
mod request;
mod response;
mod settings;
/// Change notifications
pub mod signal;
mod stickyauth;
mod store;
mod view;

pub use body::Body;
pub use errors::{Error, Result};
pub use filter::{Filter, Matcher};
pub use flow::{Flow, FlowId};
pub use focus::Focus;
pub use http::header;
pub use http::Method;
pub use http::{StatusCode, Version};
pub use options::Options;
pub use order::{OrderKey, SortKey};
pub use request::Request;
pub use response::Response;
pub use settings::{Settings, SettingsStore};
pub use signal::{Handler, Signal, SignalEvent, SignalKind, Signals, SubscriptionId};
pub use stickyauth::StickyAuth;
pub use store::FlowStore;
pub use view::{Iter, SharedView, View};
