//! Data model for structured assembly.
//!
//! Holds the AST (closed sum types with value-owned children), the object
//! model with recursive subobjects, the dialect tables for the 256-bit EVM
//! flavour and the 64-bit wasm flavour, the fresh-name dispenser and the
//! read-only visitor used by the passes.

pub mod ast;
pub mod dialect;
pub mod display;
pub mod names;
pub mod object;
pub mod visitor;

pub use crate::{
    ast::{
        Assignment, Block, Case, Expression, ForLoop, FunctionCall, FunctionDefinition, Identifier,
        If, Literal, Statement, Switch, VariableDeclaration,
    },
    dialect::{BuiltinFunction, Dialect},
    names::NameDispenser,
    object::{Data, Object, ObjectMember},
};
