pub mod buffer;
pub mod frame;
pub mod keyboard;
pub mod process;
pub mod queue;
pub mod scheduler;

pub use buffer::InputBuffer;
pub use frame::{ContextFrame, FrameTemplate, Stack, StackPointer};
pub use keyboard::{Modifiers, ScancodeTranslator};
pub use process::{ProcessControlBlock, ProcessId, ProcessState, ProcessTable};
pub use scheduler::{QueueKind, Scheduler};
