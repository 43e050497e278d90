pub mod explain;
pub mod init;
pub mod make;
