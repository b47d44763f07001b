//! The workflow kernel and its service facade.

pub mod kernel;
pub mod service;

pub use kernel::{WorkflowKernel, WorkflowNode, WorkflowSnapshot};
pub use service::{NewSessionRequest, SessionService};
