pub mod enums;
pub mod order;
pub mod report;
pub mod result;
pub mod staged;
pub mod upload;

pub use order::*;
pub use report::*;
pub use result::*;
pub use staged::*;
pub use upload::*;
