pub mod exception;
pub mod function_code;
pub mod response;

pub use exception::{encode_exception_frame, ExceptionCode};
pub use function_code::FunctionCode;
pub use response::*;
