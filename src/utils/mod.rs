pub mod ids;
pub mod keyed_mutex;
pub mod validation;
