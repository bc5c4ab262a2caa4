mod condvar;
mod mutex;

pub use condvar::*;
pub use mutex::*;
