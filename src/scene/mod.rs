//! The visual side: a bounded, decaying population of touch nodes.
//!
//! [`NodeSimulation`] owns the state; [`render`] turns a snapshot into
//! drawable shapes without feeding anything back.

pub mod node;
pub mod render;
pub mod simulation;

pub use node::{Node, NodeId, Point};
pub use simulation::NodeSimulation;
