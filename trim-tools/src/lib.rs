pub mod aggregator;

pub mod d3d9;

pub mod geometry;

pub mod opcode;

pub mod region;

pub mod resource;

pub mod trim;
