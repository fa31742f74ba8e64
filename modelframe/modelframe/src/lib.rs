mod error;
mod frame;

pub use error::ModelFrameError;
pub use frame::ModelFrame;
pub use modelframe_arrow as arrow;
pub use modelframe_core as core;
pub use modelframe_formula as formula;
