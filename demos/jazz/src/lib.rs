//! Types generated from `jazz.bop` by the Rust backend at build time.

include!(concat!(env!("OUT_DIR"), "/jazz.rs"));
