pub mod assessor;
pub mod controller;
pub mod leads;
