//! The three rendering surfaces and the state they share.
//!
//! Each surface owns a [`Store`] loaded from the backend and kept current by
//! draining row-change messages from the bus. Surfaces never talk to each
//! other directly.

pub mod console;
pub mod desk;
pub mod projector;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use console::{AdminConsole, TallyView};
pub use desk::{CheckInDesk, CheckInRequest, MemberStatus, check_desk_context, prepare_check_in};
pub use projector::{ProjectorScreen, ProjectorSurface, ResultBoard, authorize_mode_change, derive_screen};
pub use store::{Store, StoreEvent};

/// Rendering context a client runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceRole {
    Desk,
    Admin,
    /// Vote commission console: may edit tallies and publish results, nothing else.
    Commission,
    Projector,
}

impl SurfaceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceRole::Desk => "desk",
            SurfaceRole::Admin => "admin",
            SurfaceRole::Commission => "commission",
            SurfaceRole::Projector => "projector",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "desk" => Some(SurfaceRole::Desk),
            "admin" => Some(SurfaceRole::Admin),
            "commission" => Some(SurfaceRole::Commission),
            "projector" => Some(SurfaceRole::Projector),
            _ => None,
        }
    }

    /// Admin and commission consoles may write vote counters and declarations.
    pub fn can_edit_votes(&self) -> bool {
        matches!(self, SurfaceRole::Admin | SurfaceRole::Commission)
    }
}

impl fmt::Display for SurfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
