pub mod context;
pub mod doctor;
pub mod list;
pub mod path;
pub mod pr;
pub mod reset;
pub mod sync;

pub use context::CommandContext;
pub use doctor::*;
pub use list::*;
pub use path::*;
pub use pr::*;
pub use reset::*;
pub use sync::*;
