/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Crystal structure representation
//!
//! This module contains the external structure interface, the unit cell
//! metric, symmetry operations and the synchronized [`CrystalModel`].

pub mod atom;
pub mod cell;
pub mod database;
pub mod errors;
pub mod model;
pub mod structure;
pub mod symmetry;
pub mod vector;

pub use atom::{Adp, Atom};
pub use cell::UnitCell;
pub use errors::{CrystalError, Result};
pub use model::CrystalModel;
pub use structure::{Scatterer, Structure, StructureSource};
pub use symmetry::{SpaceGroup, SymmetryOperation};
pub use vector::Vector3D;
