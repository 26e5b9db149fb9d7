pub mod rolling_window;
pub mod snapshot;

pub use rolling_window::RollingWindow;
pub use snapshot::WindowSnapshot;
