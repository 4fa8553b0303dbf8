pub mod render_loop;
pub mod rings;
pub mod surface;

pub use render_loop::{FrameHandle, FrameQueue, FrameScheduler, LoopState, RenderLoop, RenderStyle};
pub use rings::{RingMapper, RingSpec, RingTuning, VisualElement};
pub use surface::{Glow, Hsla, NannouSurface, Rgba, Surface};
