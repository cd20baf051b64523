// 响应式状态模块

mod writable;

pub use writable::{Subscription, Writable};
