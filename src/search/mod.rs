pub mod lexical;
pub mod universal;
