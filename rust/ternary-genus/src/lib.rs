//! Genus enumeration and Hecke operators for positive-definite ternary
//! quadratic forms of squarefree discriminant.
//!
//! Modules:
//! - [`quadform`]: forms, canonical reduction, automorphisms
//! - [`isometry`]: integral 3×3 maps between forms
//! - [`neighbor`]: Kneser p-neighbors
//! - [`spinor`]: spinor norm characters
//! - [`table`]: insertion-ordered dedup table
//! - [`genus`], [`hecke`]: enumeration and Hecke matrices
//! - [`any`]: precision chosen at run time

pub mod any;
pub mod config;
pub mod error;
pub mod genus;
pub mod hecke;
pub mod isometry;
pub mod matrix;
pub mod neighbor;
pub mod quadform;
mod reduction;
pub mod spinor;
pub mod symbol;
pub mod table;

pub use any::AnyGenus;
pub use config::GenusConfig;
pub use error::{GenusError, Result};
pub use genus::{mass_x24, Genus, GenusRep};
pub use hecke::{NeighborIsometries, NeighborIsometry};
pub use isometry::{Isometry, Vector};
pub use matrix::{CsrMatrix, DenseMatrix};
pub use neighbor::NeighborManager;
pub use quadform::QuadForm;
pub use spinor::Spinor;
pub use symbol::{find_form, PrimeSymbol, MAX_PRIME_SYMBOLS};
pub use table::{Keyed, RepTable};

pub use genus_arith::{Precision, Ring, W64};
