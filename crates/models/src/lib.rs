//! Boundary-condition models for flexstep simulations.

mod dirichlet;

pub use dirichlet::{DirichletConfig, DirichletConfigError, DirichletModel, Method, Phase};
