pub mod frame;
pub mod packet;
pub mod reader;
pub mod session;
