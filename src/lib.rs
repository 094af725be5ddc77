//! State and interaction core for a grid-based report/form designer.
//!
//! Users drag widget types from a palette onto a canvas, position and resize
//! them on a grid, nest them inside tab containers, edit their properties and
//! undo/redo every change. This crate owns the authoritative layout, the
//! command history, the cross-surface drag/drop protocol and the event
//! channel that keeps those pieces in step. Rendering each widget and
//! converting pixels to grid cells are the host's job; the host plugs in
//! through [`geometry::GridGeometry`] and by routing pointer input through a
//! [`session::DesignerSession`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Composition root wiring store, channel and drag coordinators |
//! | [`store`] | Designer facade: layout, history, selection, import/export |
//! | [`drag`] | Per-surface drag coordinator and the nested hand-off |
//! | [`surface`] | Drop policy for the main canvas and nested tab panes |
//! | [`events`] | Typed publish/subscribe channel |
//! | [`commands`] | Undoable insert, delete and update commands |
//! | [`history`] | Bounded undo/redo engine |
//! | [`layout`] | Widget list with nested pane addressing |
//! | [`widget`] | Widget instances, typed configs and patches |
//! | [`registry`] | Widget catalogue, factory and nesting policy |
//! | [`editors`] | Property-editor lookup per widget type |
//! | [`geometry`] | Grid-geometry collaborator contract and a uniform grid |
//! | [`throttle`] | Fixed-interval pointer-move throttle |
//! | [`replay`] | JSON-scripted host used by the CLI |
//! | [`config`] | Environment-driven settings |
//! | [`consts`] | Shared defaults and reserved ids |

pub mod commands;
pub mod config;
pub mod consts;
pub mod drag;
pub mod editors;
pub mod events;
pub mod geometry;
pub mod history;
pub mod layout;
pub mod registry;
pub mod replay;
pub mod session;
pub mod store;
pub mod surface;
pub mod throttle;
pub mod widget;
