//! Image matching for the facegate terminal.
//!
//! A captured probe is scored against every enrolled reference image and the
//! best-scoring identity is accepted when it reaches the acceptance
//! threshold. Two interchangeable scoring strategies are provided:
//!
//! - [`Strategy::Histogram`]: joint colour histogram compared with the
//!   Bhattacharyya distance ([`histogram`]).
//! - [`Strategy::Structural`]: mean structural similarity index over the
//!   intensity channel ([`structural`]).
//!
//! References live in a [`Gallery`], one image file per identity.
//!
//! ```
//! use facegate_biometric::{MatchEngine, ReferenceImage, Strategy};
//! use facegate_core::Identity;
//! use image::{Rgb, RgbImage};
//!
//! let bob = RgbImage::from_pixel(8, 8, Rgb([200, 120, 40]));
//! let references = vec![ReferenceImage::new(Identity::new("bob").unwrap(), bob.clone())];
//!
//! let engine = MatchEngine::new(Strategy::histogram());
//! let result = engine.evaluate(Some(&bob), &references);
//! assert_eq!(result.matched().map(|id| id.as_str()), Some("bob"));
//! ```

pub mod engine;
pub mod error;
pub mod gallery;
pub mod histogram;
pub mod structural;

pub use engine::{MatchEngine, ReferenceImage, Strategy, evaluate};
pub use error::{BiometricError, DataError, Result};
pub use gallery::Gallery;
