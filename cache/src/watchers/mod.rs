mod base;
mod dyn_obj_watcher;
mod typed_watcher;

pub use base::{
    EventHandler,
    ObjStream,
    ObjWatcher,
};
pub use dyn_obj_watcher::new_dyn_obj_watcher;
pub use typed_watcher::new_typed_watcher;
