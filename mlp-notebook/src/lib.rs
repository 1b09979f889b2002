//! MLP Notebook
//!
//! Reads Jupyter notebooks and extracts the pipeline declarations written in
//! their cells, without executing anything.
//!
//! A declaration cell contains calls such as
//! `pipeline.add_deps_to_stage("train", "train.ipynb", "../data/train.csv")`
//! or `report.add_text_to_report("## Results")`. Each recognized call becomes
//! a [`Directive`]; arguments must be literals.
//!
//! # Example
//!
//! ```
//! use mlp_notebook::{Directive, parse_directives};
//!
//! let directives = parse_directives(r#"pipeline.add_outs_to_stage("prep", "../outputs/clean.csv")"#)?;
//! assert_eq!(
//!     directives,
//!     vec![Directive::AddOuts {
//!         stage: "prep".to_string(),
//!         outs: vec!["../outputs/clean.csv".to_string()],
//!     }]
//! );
//! # Ok::<(), mlp_notebook::ParseError>(())
//! ```

pub mod directive;
pub mod error;
pub mod literal;
pub mod notebook;
pub mod parser;

pub use directive::Directive;
pub use error::{NotebookError, ParseError};
pub use notebook::{Cell, Notebook, load_directives, read_notebook};
pub use parser::parse_directives;
