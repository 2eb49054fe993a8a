pub mod company;
pub mod value_objects;

pub use company::Company;
