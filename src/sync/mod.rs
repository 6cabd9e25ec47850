//! Document to deck synchronization.
//!
//! One run goes through these stages:
//!
//! - **Realign**: documents that keep a backward id but lost their reverse
//!   prompt get that id cleared, after confirmation
//! - **Cards**: every document renders one or two [`OrientedCard`]s, tagged
//!   with their remote id when one is known ([`DesiredCard`])
//! - **Diff**: desired cards are compared against the listed deck
//! - **Apply**: the diff runs as a lazy sequence of single remote calls
//!
//! # Example
//!
//! ```ignore
//! use cards::sync::{Workspace, MissingRemotePolicy, Terminal};
//!
//! let mut workspace = Workspace::load(&root)?;
//! workspace.realign(&mut Terminal)?;
//! let plan = workspace.plan(&client, &deck_id, MissingRemotePolicy::Fail)?;
//! for step in plan.apply(&client, &deck_id) {
//!     println!("{:?}", step?);
//! }
//! ```

mod apply;
mod cards;
mod confirm;
mod diff;
mod run;

pub use apply::{AppliedStep, ApplyDiff, apply};
pub use cards::{DesiredCard, OrientedCard, desired_cards};
pub use confirm::{AssumeYes, Confirm, Terminal};
pub use diff::{Diff, MissingRemotePolicy, compute};
pub use run::{Observer, Plan, Silent, SyncOptions, SyncReport, Workspace, sync};
