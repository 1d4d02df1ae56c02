// handlers/protected/session/mod.rs - Device and upload endpoints tied to the caller

pub mod device;
pub mod upload;

pub use device::logout as device_logout;
pub use device::register as device_register;
pub use upload::sign as upload_sign;
