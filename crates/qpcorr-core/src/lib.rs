pub mod config;
pub mod domain;
pub mod lattice;
pub mod numerics;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod solver;
