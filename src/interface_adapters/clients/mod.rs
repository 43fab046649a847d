pub mod visualization;
