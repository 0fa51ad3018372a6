mod filesystem;

pub use filesystem::{mount, FuseDriver};
