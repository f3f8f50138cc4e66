pub mod window;

pub use window::{TrackedWindow, WindowEvent, WindowEventKind, WindowHandle};
