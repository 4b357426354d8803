//! Navbar rendering for the Mailsfinder account client.

mod gate;
mod model;
mod presenter;

pub use gate::{MountGate, MountHandle};
pub use model::{NavbarModel, NavbarSurface};
pub use presenter::{NavbarPresenter, NAVBAR_MOUNT_DEADLINE, PROFILE_FETCH_TIMEOUT};
