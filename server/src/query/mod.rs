//! Query handling for one shard.
//!
//! A [`QueryHandler`] accepts a request, consults the time source and the
//! anomaly model, reads or appends to the version store, and produces a
//! response annotated with how long the caller should additionally wait.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use lagstore::anomaly::AnomalyModel;
//! use lagstore::query::QueryHandler;
//! use lagstore::simulation::SimulatedTimeSource;
//! use lagstore::storage::VersionStore;
//! use lagstore::types::{ClientRequest, NodeId, Outcome, Record};
//!
//! let time = Arc::new(SimulatedTimeSource::new(0));
//! let store = Arc::new(VersionStore::new());
//! let model = Arc::new(AnomalyModel::constant(0, 500));
//! let nodes = vec![NodeId(0), NodeId(1)];
//! let a = QueryHandler::new(NodeId(0), nodes.clone(), store.clone(), model.clone(), time.clone());
//! let b = QueryHandler::new(NodeId(1), nodes, store, model, time.clone());
//!
//! a.handle(ClientRequest::insert("t", "k", Record::new().with("f", "v")));
//! assert_eq!(b.handle(ClientRequest::read("t", "k", None)).outcome, Outcome::NotFound);
//!
//! time.advance(500);
//! assert!(b.handle(ClientRequest::read("t", "k", None)).found().is_some());
//! ```

mod handler;

pub use handler::QueryHandler;
