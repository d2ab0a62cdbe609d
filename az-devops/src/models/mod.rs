mod identity;
mod work_item;

pub use identity::*;
pub use work_item::*;
