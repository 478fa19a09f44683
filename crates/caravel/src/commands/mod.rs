pub mod build;
pub mod down;
pub mod logs;
pub mod ps;
pub mod up;
pub mod validate;
