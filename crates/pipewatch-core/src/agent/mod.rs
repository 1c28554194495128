//! Agents: the collaborators that perform the work behind each step.
//!
//! - `dispatch`: the `Agent` capability trait (`dispatch(action, input)`)
//! - `box_agent`: object-safe `BoxAgent` wrapper
//! - `action`: closure-table `ActionAgent`
//! - `registry`: name-indexed `AgentRegistry`

pub mod action;
pub mod box_agent;
pub mod dispatch;
pub mod registry;
