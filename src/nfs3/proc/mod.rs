//! One module per NFSv3 procedure group: decode args, run the operation
//! against [`crate::vfs::Vfs`], encode the XDR result (spec §4.8).

pub mod access;
pub mod create;
pub mod fs;
pub mod get_attr;
pub mod link;
pub mod lookup;
pub mod read;
pub mod read_dir;
pub mod read_dir_plus;
pub mod read_link;
pub mod remove;
pub mod rename;
pub mod set_attr;
pub mod write;
