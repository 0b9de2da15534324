#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod filter;
mod interpolation;
mod transform_ext;

pub use filter::*;
pub use interpolation::*;
pub use transform_ext::*;

/// The math prelude.
///
/// This includes the most common types in this crate, re-exported for your convenience.
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        LerpMode, OneEuroConfig, OneEuroFilter, PeakFilter, TransformExt, find_between,
    };
}
