mod click_event;
mod hook;
mod observer;
#[cfg(feature = "os-hook")]
mod rdev_hook;

pub use click_event::{ClickEvent, MouseButton};
pub use hook::{ClickHook, ClickSender, SyntheticClickHook};
pub use observer::{InputObserver, ObserverStatus};
#[cfg(feature = "os-hook")]
pub use rdev_hook::RdevClickHook;
