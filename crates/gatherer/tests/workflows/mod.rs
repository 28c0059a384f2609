use super::*;

mod cached;
mod combinations;
mod titles;
